//! Independent contexts over one graph.

use std::sync::{Barrier, Mutex};
use std::thread;

use tessera_tests::prelude::*;

mod isolation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_threads_do_not_see_each_others_pending_work() {
        // GIVEN
        let graph = memory_graph();
        let barrier = Barrier::new(2);
        let staged: Mutex<Vec<ElementId>> = Mutex::new(Vec::new());

        // WHEN: two threads stage a vertex each, look for the other's, then commit
        thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    let mut ctx = graph.begin();
                    let v = ctx.add_vertex().unwrap();
                    staged.lock().unwrap().push(v.id());
                    barrier.wait();

                    let ids = staged.lock().unwrap().clone();
                    for id in ids.into_iter().filter(|id| *id != v.id()) {
                        assert!(ctx.get_live_element(id).unwrap().is_none());
                    }
                    barrier.wait();

                    ctx.commit_transaction().unwrap();
                    assert!(v.identity().is_permanent());
                });
            }
        });

        // THEN
        let ctx = graph.begin();
        let ids = staged.into_inner().unwrap();
        assert_eq!(ids.len(), 2);
        for id in ids {
            assert!(ctx.get_live_element(id).unwrap().is_some());
        }
        assert_eq!(graph.store().transaction_count(), 2);
    }

    #[test]
    fn test_committed_work_is_visible_to_other_contexts() {
        let graph = memory_graph();
        let mut writer = graph.begin();
        let reader = graph.begin();
        let v = writer.add_vertex().unwrap();
        assert!(reader.get_live_element(v.id()).unwrap().is_none());

        writer.commit_transaction().unwrap();

        assert!(reader.get_live_element(v.id()).unwrap().is_some());
    }
}

mod interleaving {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_change_to_concurrently_removed_vertex_fails() {
        // GIVEN: one context changes v while another removes it
        let graph = memory_graph();
        let mut setup = graph.begin();
        let v = setup.add_vertex().unwrap();
        setup.commit_transaction().unwrap();

        let mut first = graph.begin();
        let mut second = graph.begin();
        second.set_property(&v, "name", "late").unwrap();
        first.remove_vertex(&v).unwrap();
        first.commit_transaction().unwrap();

        // WHEN
        let result = second.commit_transaction();

        // THEN
        assert!(matches!(
            result,
            Err(GraphError::StoreCommitFailed(StoreError::UnknownEntity { .. }))
        ));
        assert_eq!(second.pending_len(), 0);
        assert_eq!(graph.store().transaction_count(), 2);
    }
}

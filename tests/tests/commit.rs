//! Commit, rollback and identity resolution.

use tessera_tests::prelude::*;

mod resolution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_staged_handle_becomes_permanent() {
        // GIVEN: staged vertices and an edge, plus a second handle to one vertex
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let a = ctx.add_vertex().unwrap();
        let b = ctx.add_vertex().unwrap();
        let e = ctx.add_edge(&a, &b, "knows").unwrap();
        let again = ctx.get_live_element(a.id()).unwrap().unwrap();
        assert!(again.identity().is_temporary());

        // WHEN
        let t = ctx.commit_transaction().unwrap();

        // THEN
        assert_eq!(t, Some(TxTime::new(1)));
        for element in [&a, &b, &e, &again] {
            assert!(element.identity().is_permanent(), "{} is still temporary", element);
        }
        assert_eq!(again.entity_id(), a.entity_id());
        assert_ne!(a.entity_id(), b.entity_id());
        assert_ne!(a.entity_id(), e.entity_id());
    }

    #[test]
    fn test_lost_assignment_is_a_consistency_violation() {
        // GIVEN: a store that forgets which temporary ids it assigned
        init_tracing();
        let graph = Graph::new(LossyStore::new(MemoryFactStore::new()));
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();

        // WHEN
        let result = ctx.commit_transaction();

        // THEN: the store has the data, the handle was not rewritten
        assert!(matches!(
            result,
            Err(GraphError::Transaction(TransactionError::ConsistencyViolation { .. }))
        ));
        assert_eq!(ctx.pending_len(), 0);
        assert!(v.identity().is_temporary());
        assert_eq!(graph.store().inner().transaction_count(), 1);
    }
}

mod failure {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failed_commit_discards_pending_operations() {
        // GIVEN
        init_tracing();
        let graph = Graph::new(FailingStore::new(MemoryFactStore::new()));
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        ctx.set_property(&v, "name", "lost").unwrap();
        graph.store().fail_next_commit();

        // WHEN
        let result = ctx.commit_transaction();

        // THEN
        assert!(matches!(
            result,
            Err(GraphError::StoreCommitFailed(StoreError::Unavailable { .. }))
        ));
        assert_eq!(ctx.pending_len(), 0);
        assert!(v.identity().is_temporary());
        assert!(ctx.get_live_element(v.id()).unwrap().is_none());
        assert_eq!(graph.store().inner().transaction_count(), 0);
    }

    #[test]
    fn test_context_is_usable_after_failure() {
        init_tracing();
        let graph = Graph::new(FailingStore::new(MemoryFactStore::new()));
        let mut ctx = graph.begin();
        ctx.add_vertex().unwrap();
        graph.store().fail_next_commit();
        assert!(ctx.commit_transaction().is_err());

        let v = ctx.add_vertex().unwrap();
        let t = ctx.commit_transaction().unwrap();

        assert_eq!(t, Some(TxTime::new(1)));
        assert!(v.identity().is_permanent());
    }
}

mod rollback {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rollback_leaves_no_trace() {
        // GIVEN: a committed vertex
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        ctx.set_property(&v, "name", "A").unwrap();
        ctx.commit_transaction().unwrap();
        let datoms = graph.store().datom_count();

        // WHEN: several kinds of change are staged, then rolled back
        ctx.set_property(&v, "name", "B").unwrap();
        let w = ctx.add_vertex().unwrap();
        ctx.add_edge(&v, &w, "knows").unwrap();
        ctx.annotate("author", "alice").unwrap();
        assert_eq!(ctx.property(&v, "name").unwrap(), Some(Value::from("B")));
        ctx.rollback_transaction();

        // THEN
        assert!(ctx.batch().is_empty());
        assert_eq!(ctx.property(&v, "name").unwrap(), Some(Value::from("A")));
        assert!(ctx.get_live_element(w.id()).unwrap().is_none());
        assert!(ctx.incident_edges(&v).unwrap().is_empty());
        assert_eq!(graph.store().transaction_count(), 1);
        assert_eq!(graph.store().datom_count(), datoms);
    }

    #[test]
    fn test_mutating_rolled_back_vertex_is_not_in_transaction() {
        // GIVEN: a vertex staged then rolled back
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let w = ctx.add_vertex().unwrap();
        ctx.rollback_transaction();

        // WHEN
        let result = ctx.set_property(&w, "name", "W");

        // THEN
        assert!(matches!(
            result,
            Err(GraphError::Transaction(TransactionError::NotInTransaction { .. }))
        ));
        assert!(ctx.batch().is_empty());
    }

    #[test]
    fn test_annotation_alone_commits_a_transaction() {
        let graph = memory_graph();
        let mut ctx = graph.begin();
        ctx.annotate("author", "alice").unwrap();

        let t = ctx.commit_transaction().unwrap().unwrap();

        let info = graph.store().tx_info(t).unwrap();
        assert_eq!(
            info.annotation(&Attribute::tx("author").unwrap()),
            Some(&Value::from("alice"))
        );
    }
}

mod dump {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pending_batch_is_written_as_json_lines() {
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        ctx.set_property(&v, "name", "bar").unwrap();
        ctx.annotate("author", "alice").unwrap();

        let mut out = Vec::new();
        let written = ctx.dump_pending(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(written, 2);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("property/name"));
        assert!(text.contains("tx/author"));
        assert_eq!(ctx.pending_len(), 2);
    }
}

//! End-to-end scenarios over the in-memory store.

use tessera_tests::prelude::*;

mod create_and_read {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_committed_property_is_readable_by_id() {
        // GIVEN: a vertex with name="bar", committed
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        ctx.set_property(&v, "name", "bar").unwrap();
        ctx.commit_transaction().unwrap();

        // WHEN: the vertex is read back by id, here and from a new context
        let read = ctx.get_live_element(v.id()).unwrap().unwrap();
        let other = graph.begin();
        let elsewhere = other.get_live_element(v.id()).unwrap().unwrap();

        // THEN
        assert_eq!(ctx.property(&read, "name").unwrap(), Some(Value::from("bar")));
        assert_eq!(other.property(&elsewhere, "name").unwrap(), Some(Value::from("bar")));
        assert_eq!(read, v);
    }
}

mod rollback_keeps_committed {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rolled_back_vertex_is_unreachable() {
        // GIVEN: V1 -knows-> V2, committed
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v1 = ctx.add_vertex().unwrap();
        let v2 = ctx.add_vertex().unwrap();
        let e = ctx.add_edge(&v1, &v2, "knows").unwrap();
        ctx.commit_transaction().unwrap();

        // WHEN: V3 is created, then rolled back
        let v3 = ctx.add_vertex().unwrap();
        assert!(ctx.get_live_element(v3.id()).unwrap().is_some());
        ctx.rollback_transaction();

        // THEN
        assert!(ctx.get_live_element(v3.id()).unwrap().is_none());
        assert!(ctx.get_live_element(v1.id()).unwrap().is_some());
        assert!(ctx.get_live_element(v2.id()).unwrap().is_some());
        let edge = ctx.get_live_element(e.id()).unwrap().unwrap();
        assert_eq!(edge.label(), Some("knows"));
        assert_eq!(edge.out_vertex(), Some(v1.id()));
        assert_eq!(edge.in_vertex(), Some(v2.id()));
        assert_eq!(ctx.incident_edges(&v1).unwrap(), vec![e]);
        assert_eq!(graph.store().transaction_count(), 1);
    }
}

mod remove_committed_property {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_removed_property_is_absent() {
        // GIVEN: V1 committed, then age=30 committed
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v1 = ctx.add_vertex().unwrap();
        ctx.commit_transaction().unwrap();
        ctx.set_property(&v1, "age", 30i64).unwrap();
        let t_age = ctx.commit_transaction().unwrap().unwrap();

        // WHEN: the property is removed and committed
        let removed = ctx.remove_property(&v1, "age").unwrap();
        ctx.commit_transaction().unwrap();

        // THEN
        assert_eq!(removed, Some(Value::Int(30)));
        assert_eq!(ctx.property(&v1, "age").unwrap(), None);
        assert!(ctx.property_keys(&v1).unwrap().is_empty());
        let pinned = ctx.get_pinned_element(v1.id(), t_age).unwrap().unwrap();
        assert_eq!(ctx.property(&pinned, "age").unwrap(), Some(Value::Int(30)));
    }
}

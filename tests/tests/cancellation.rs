//! Merging and cancellation of pending operations.

use tessera_tests::prelude::*;
use tessera_core::TempId;
use tessera_transaction::OperationLog;

mod contradiction {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_then_remove_yields_empty_batch() {
        // GIVEN
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        let e = ctx.add_edge(&v, &v, "self").unwrap();

        // WHEN
        ctx.remove_edge(&e).unwrap();
        ctx.remove_vertex(&v).unwrap();

        // THEN: nothing reaches the store
        assert!(ctx.batch().is_empty());
        assert_eq!(ctx.commit_transaction().unwrap(), None);
        assert_eq!(graph.store().transaction_count(), 0);
    }

    #[test]
    fn test_mutating_cancelled_element_is_stale() {
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        ctx.remove_vertex(&v).unwrap();

        let result = ctx.set_property(&v, "name", "x");

        assert!(matches!(
            result,
            Err(GraphError::Transaction(TransactionError::StaleOperation { .. }))
        ));
        assert!(ctx.is_deleted(&v).unwrap());
    }
}

mod cascade {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_removing_staged_vertex_cancels_its_edges() {
        // GIVEN: an edge touching a staged vertex
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        let e = ctx.add_edge(&v, &v, "loop").unwrap();

        // WHEN
        ctx.remove_vertex(&v).unwrap();

        // THEN: the edge went with it
        assert!(ctx.batch().is_empty());
        assert!(ctx.is_deleted(&e).unwrap());
        assert!(matches!(
            ctx.set_property(&e, "weight", 1i64),
            Err(GraphError::Transaction(TransactionError::StaleOperation { .. }))
        ));
    }

    #[test]
    fn test_cascade_leaves_unrelated_adds() {
        // GIVEN
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let a = ctx.add_vertex().unwrap();
        let b = ctx.add_vertex().unwrap();
        let c = ctx.add_vertex().unwrap();
        ctx.add_edge(&a, &b, "x").unwrap();
        let kept = ctx.add_edge(&b, &c, "y").unwrap();

        // WHEN
        ctx.remove_vertex(&a).unwrap();
        let t = ctx.commit_transaction().unwrap();

        // THEN
        assert!(t.is_some());
        assert!(ctx.get_live_element(a.id()).unwrap().is_none());
        assert!(ctx.get_live_element(kept.id()).unwrap().is_some());
        assert_eq!(ctx.incident_edges(&b).unwrap(), vec![kept]);
    }

    #[test]
    fn test_removing_committed_vertex_removes_incident_edges() {
        // GIVEN: a -> b committed, plus a staged edge c -> a
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let a = ctx.add_vertex().unwrap();
        let b = ctx.add_vertex().unwrap();
        let committed_edge = ctx.add_edge(&a, &b, "knows").unwrap();
        ctx.commit_transaction().unwrap();
        let c = ctx.add_vertex().unwrap();
        let staged_edge = ctx.add_edge(&c, &a, "likes").unwrap();

        // WHEN
        ctx.remove_vertex(&a).unwrap();

        // THEN: the committed edge is retracted, the staged one cancelled
        let a_entity = a.entity_id().unwrap();
        let edge_entity = committed_edge.entity_id().unwrap();
        let batch = ctx.batch();
        assert_eq!(batch.len(), 3);
        assert!(batch.contains(&Statement::retract_entity(edge_entity)));
        assert!(batch.contains(&Statement::retract_entity(a_entity)));
        assert!(ctx.is_deleted(&staged_edge).unwrap());

        ctx.commit_transaction().unwrap();
        assert!(ctx.get_live_element(committed_edge.id()).unwrap().is_none());
        assert!(ctx.get_live_element(c.id()).unwrap().is_some());
        assert!(ctx.incident_edges(&b).unwrap().is_empty());
        assert!(matches!(
            ctx.set_property(&a, "name", "gone"),
            Err(GraphError::Transaction(TransactionError::NotInTransaction { .. }))
        ));
    }
}

mod merge {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repeated_sets_merge_into_add() {
        // GIVEN
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();

        // WHEN
        ctx.set_property(&v, "k", "a").unwrap();
        ctx.set_property(&v, "k", "b").unwrap();

        // THEN: one add carrying the last value
        let batch = ctx.batch();
        assert_eq!(batch.len(), 1);
        match &batch[0] {
            Statement::Assert { attrs, .. } => {
                assert_eq!(
                    attrs.get(&Attribute::parse("property/k").unwrap()),
                    Some(&Value::from("b"))
                );
            }
            other => panic!("expected an assert, got {}", other),
        }
    }

    #[test]
    fn test_committed_element_modifications_merge() {
        let graph = memory_graph();
        let mut ctx = graph.begin();
        let v = ctx.add_vertex().unwrap();
        ctx.commit_transaction().unwrap();

        ctx.set_property(&v, "k", "a").unwrap();
        ctx.set_property(&v, "k", "b").unwrap();
        ctx.set_property(&v, "other", 1i64).unwrap();

        let entity = v.entity_id().unwrap();
        assert_eq!(
            ctx.batch(),
            vec![Statement::assert(
                entity,
                attrs! { "property/k" => "b", "property/other" => 1i64 }
            )]
        );
    }

    #[test]
    fn test_operations_on_one_id_leave_others_alone() {
        // GIVEN
        let mut log = OperationLog::new();
        let a = ElementId::generate();
        let b = ElementId::generate();
        let a_statement = Statement::assert(TempId::new(1), attrs! { "property/n" => 1i64 });
        let b_statement = Statement::assert(TempId::new(2), attrs! { "property/n" => 2i64 });
        log.record_add(a, a_statement, vec![]).unwrap();
        log.record_add(b, b_statement.clone(), vec![]).unwrap();
        let before = log.operation(b).cloned();

        // WHEN
        log.set_property(a, Attribute::parse("property/x").unwrap(), Value::Int(1))
            .unwrap();
        log.record_delete(a, Statement::retract_entity(TempId::new(1)))
            .unwrap();

        // THEN
        assert_eq!(log.operation(b).cloned(), before);
        assert_eq!(log.batch(), vec![b_statement]);
    }
}

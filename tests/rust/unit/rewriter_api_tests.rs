//! Unit tests for fragment rewriting and filter compilation through the public API

#[cfg(test)]
mod rewriter_api_tests {
    use soql_compiler::field_rewriter::{CollectingSink, FieldPathRewriter, RewriteError};
    use soql_compiler::query_plan::{ColumnExpr, JoinEdge, LookupKind, WhereChild, WhereNode};
    use soql_compiler::topology::{resolve_topology, TopologyMap};
    use soql_compiler::where_compiler::{Compiled, WhereCompiler};

    fn case_topology() -> TopologyMap {
        resolve_topology(&[
            JoinEdge::base("Case", "K"),
            JoinEdge::join("K", "Contact", ("ContactId", "Id"), "C"),
            JoinEdge::join("C", "Account", ("AccountId", "Id"), "A"),
        ])
        .unwrap()
    }

    #[test]
    fn test_rewrite_keeps_surrounding_text() {
        let topology = case_topology();
        let rewriter = FieldPathRewriter::new(&topology);
        assert_eq!(
            rewriter.rewrite("CALENDAR_YEAR(C.Birthdate) NOT IN (%s, %s)").unwrap(),
            "CALENDAR_YEAR(Case.Contact.Birthdate) NOT IN (%s, %s)"
        );
        assert_eq!(
            rewriter.rewrite("A.Industry != null").unwrap(),
            "Case.Contact.Account.Industry != null"
        );
    }

    #[test]
    fn test_polymorphic_type_field() {
        let topology = case_topology();
        let rewriter = FieldPathRewriter::new(&topology);
        assert_eq!(rewriter.rewrite("K.Owner.Type").unwrap(), "Case.Owner.Type");
    }

    #[test]
    fn test_warning_sink_and_strict_mode() {
        let topology = case_topology();
        let sink = CollectingSink::new();
        let rewriter = FieldPathRewriter::new(&topology).with_sink(&sink);
        assert_eq!(rewriter.rewrite("LEN(C.Name) * 2").unwrap(), "LEN(C.Name) * 2");
        assert_eq!(sink.warnings()[0].fragment, "LEN(C.Name) * 2");

        let strict = FieldPathRewriter::new(&topology).strict(true);
        assert!(matches!(
            strict.rewrite("LEN(C.Name) * 2"),
            Err(RewriteError::Unrewritable { .. })
        ));
    }

    #[test]
    fn test_where_compiler_over_public_types() {
        let topology = case_topology();
        let rewriter = FieldPathRewriter::new(&topology).with_minimal_aliases(true);
        let compiler = WhereCompiler::new(&rewriter);

        let node = WhereNode::or(vec![
            WhereChild::lookup(ColumnExpr::col("K", "Status"), LookupKind::Exact, "New"),
            WhereChild::Node(WhereNode::and(vec![
                WhereChild::lookup(ColumnExpr::col("A", "Name"), LookupKind::Contains, "50%"),
                WhereChild::lookup(ColumnExpr::col("C", "Email"), LookupKind::IsNull, false),
            ])),
        ]);
        let compiled = compiler.compile(&node).unwrap().into_sql().unwrap();
        assert_eq!(
            compiled.sql,
            "(Status = %s OR (Contact.Account.Name LIKE %s AND Contact.Email != null))"
        );
        assert_eq!(compiled.params.len(), 2);

        let everything = WhereNode::or(vec![WhereChild::Everything]).negate();
        assert_eq!(compiler.compile(&everything).unwrap(), Compiled::MatchesNothing);
    }
}

//! Integration tests for compiling planner output end to end
//!
//! Plans are written the way the upstream planner serializes them, so these
//! tests also pin the JSON plan format.

#[cfg(test)]
mod plan_compilation_tests {
    use soql_compiler::config::{CompilerConfig, TargetVersion};
    use soql_compiler::field_rewriter::CollectingSink;
    use soql_compiler::query_plan::{QueryPlan, SoqlValue};
    use soql_compiler::soql_generator::{
        SalesforceDialect, SoqlCompiler, SoqlGeneratorError, SoqlResult, CompiledQuery,
    };

    fn compile_json(json: &str, config: &CompilerConfig) -> (SoqlResult<CompiledQuery>, CollectingSink) {
        let mut plan: QueryPlan = serde_json::from_str(json).expect("plan should deserialize");
        let dialect = SalesforceDialect::new();
        let sink = CollectingSink::new();
        let result = SoqlCompiler::new(&mut plan, &dialect, config)
            .with_sink(&sink)
            .as_sql(true, false);
        (result, sink)
    }

    const THREE_LEVEL_PLAN: &str = r#"{
        "model": {"db_table": "Contact"},
        "alias_map": [
            {"table_name": "Contact", "table_alias": "C"},
            {"parent_alias": "C", "table_name": "Account",
             "join_cols": [["AccountId", "Id"]], "table_alias": "A"},
            {"parent_alias": "A", "table_name": "User",
             "join_cols": [["OwnerId", "Id"]], "table_alias": "U"}
        ],
        "select": [
            {"expr": {"type": "column", "alias": "C", "column": "Name"}},
            {"expr": {"type": "column", "alias": "U", "column": "Email"}}
        ],
        "where": {"connector": "AND", "children": [
            {"type": "node", "connector": "OR", "children": [
                {"type": "lookup", "lhs": {"type": "column", "alias": "A", "column": "Name"},
                 "kind": "starts_with", "rhs": "Ac_me"},
                {"type": "lookup", "lhs": {"type": "column", "alias": "U", "column": "Email"},
                 "kind": "is_null", "rhs": true}
            ]},
            {"type": "lookup", "lhs": {"type": "column", "alias": "C", "column": "Age__c"},
             "kind": "gte", "rhs": 21}
        ]},
        "order_by": [
            {"expr": {"type": "column", "alias": "U", "column": "LastName"}, "descending": true,
             "nulls": "last"}
        ],
        "low_mark": 10,
        "high_mark": 35
    }"#;

    #[test]
    fn test_three_level_plan() {
        let (result, sink) = compile_json(THREE_LEVEL_PLAN, &CompilerConfig::default());
        let query = result.unwrap();
        assert_eq!(
            query.sql,
            "SELECT Contact.Name, Contact.Account.Owner.Email FROM Contact \
             WHERE ((Contact.Account.Name LIKE %s OR Contact.Account.Owner.Email = null) \
             AND Contact.Age__c >= %s) \
             ORDER BY Contact.Account.Owner.LastName DESC NULLS LAST LIMIT 25 OFFSET 10"
        );
        assert_eq!(
            query.params,
            vec![SoqlValue::from("Ac\\_me%"), SoqlValue::Integer(21)]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_three_level_plan_minimal_aliases() {
        let config = CompilerConfig {
            minimal_aliases: true,
            ..Default::default()
        };
        let (result, _) = compile_json(THREE_LEVEL_PLAN, &config);
        let query = result.unwrap();
        assert!(
            query.sql.starts_with("SELECT Name, Account.Owner.Email FROM Contact WHERE "),
            "{}",
            query.sql
        );
        assert!(query.sql.contains("ORDER BY Account.Owner.LastName DESC"));
    }

    #[test]
    fn test_custom_relationship_names() {
        let json = r#"{
            "model": {"db_table": "Invoice__c"},
            "alias_map": [
                {"table_name": "Invoice__c", "table_alias": "I"},
                {"parent_alias": "I", "table_name": "Project__c",
                 "join_cols": [["Project__c", "Id"]], "table_alias": "P"}
            ],
            "select": [
                {"expr": {"type": "column", "alias": "P", "column": "Budget__c"}},
                {"expr": {"type": "function", "name": "SUM",
                          "arg": {"type": "column", "alias": "I", "column": "Amount__c"}},
                 "alias": "total"}
            ],
            "group_by": [{"type": "column", "alias": "P", "column": "Budget__c"}]
        }"#;
        let (result, _) = compile_json(json, &CompilerConfig::default());
        assert_eq!(
            result.unwrap().sql,
            "SELECT Invoice__c.Project__r.Budget__c, SUM(Invoice__c.Amount__c) total \
             FROM Invoice__c GROUP BY Invoice__c.Project__r.Budget__c"
        );
    }

    #[test]
    fn test_minimal_alias_table_from_defaults() {
        let json = r#"{
            "model": {"db_table": "ContentDocumentLink"},
            "alias_map": [{"table_name": "ContentDocumentLink", "table_alias": "L"}],
            "select": [{"expr": {"type": "column", "alias": "L", "column": "LinkedEntityId"}}],
            "where": {"children": [
                {"type": "lookup", "lhs": {"type": "column", "alias": "L", "column": "LinkedEntityId"},
                 "kind": "in", "rhs": ["001A", "001B"]}
            ]}
        }"#;
        let (result, _) = compile_json(json, &CompilerConfig::default());
        let query = result.unwrap();
        assert_eq!(
            query.sql,
            "SELECT LinkedEntityId FROM ContentDocumentLink WHERE LinkedEntityId IN (%s, %s)"
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_none_queryset_is_never_sent() {
        let json = r#"{
            "model": {"db_table": "Contact"},
            "alias_map": [{"table_name": "Contact", "table_alias": "C"}],
            "select": [{"expr": {"type": "column", "alias": "C", "column": "Name"}}],
            "where": {"children": [
                {"type": "lookup", "lhs": {"type": "column", "alias": "C", "column": "Id"},
                 "kind": "in", "rhs": []}
            ]}
        }"#;
        let (result, _) = compile_json(json, &CompilerConfig::default());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_negated_filter_with_raw_fragment() {
        let json = r#"{
            "model": {"db_table": "Contact"},
            "alias_map": [{"table_name": "Contact", "table_alias": "C"}],
            "select": [{"expr": {"type": "column", "alias": "C", "column": "Name"}}],
            "where": {"negated": true, "children": [
                {"type": "raw", "sql": "C.Email LIKE %s", "params": ["%@example.com"]}
            ]}
        }"#;
        let (result, sink) = compile_json(json, &CompilerConfig::default());
        let query = result.unwrap();
        assert_eq!(
            query.sql,
            "SELECT Contact.Name FROM Contact WHERE (NOT (Contact.Email LIKE %s))"
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unrewritable_fragment_is_reported() {
        let json = r#"{
            "model": {"db_table": "Contact"},
            "alias_map": [{"table_name": "Contact", "table_alias": "C"}],
            "select": [{"expr": {"type": "raw", "sql": "C.FirstName + C.LastName"}}]
        }"#;
        let (result, sink) = compile_json(json, &CompilerConfig::default());
        assert_eq!(
            result.unwrap().sql,
            "SELECT C.FirstName + C.LastName FROM Contact"
        );
        assert_eq!(sink.warnings().len(), 1);

        let strict = CompilerConfig {
            strict_fragments: true,
            ..Default::default()
        };
        let (result, _) = compile_json(json, &strict);
        assert!(matches!(result, Err(SoqlGeneratorError::Rewrite(_))));
    }

    #[test]
    fn test_join_not_on_primary_key_is_rejected() {
        let json = r#"{
            "model": {"db_table": "Contact"},
            "alias_map": [
                {"table_name": "Contact", "table_alias": "C"},
                {"parent_alias": "C", "table_name": "Lead",
                 "join_cols": [["Email", "Email"]], "table_alias": "L"}
            ],
            "select": [{"expr": {"type": "column", "alias": "C", "column": "Name"}}]
        }"#;
        let (result, _) = compile_json(json, &CompilerConfig::default());
        let err = result.unwrap_err();
        assert!(matches!(err, SoqlGeneratorError::Topology(_)));
        assert!(err.to_string().contains("Email"), "{}", err);
    }

    #[test]
    fn test_explain_options_depend_on_target_version() {
        let json = r#"{
            "model": {"db_table": "Contact"},
            "select": [{"expr": {"type": "count_all"}}],
            "explain": {"format": "text"}
        }"#;
        let (result, _) = compile_json(json, &CompilerConfig::default());
        assert_eq!(result.unwrap().sql, "EXPLAIN SELECT COUNT(Id) FROM Contact");

        let old = CompilerConfig {
            target_version: TargetVersion::new(3, 2),
            ..Default::default()
        };
        let (result, _) = compile_json(json, &old);
        assert!(matches!(result, Err(SoqlGeneratorError::DialectCapability(_))));
    }
}

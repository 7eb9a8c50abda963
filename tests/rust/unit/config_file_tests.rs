//! Unit tests for configuration files driving compiler behaviour

#[cfg(test)]
mod config_file_tests {
    use std::io::Write;

    use soql_compiler::config::{CliOverrides, CompilerConfig, TargetVersion};
    use soql_compiler::query_plan::{ColumnExpr, JoinEdge, QueryPlan, SelectItem, TableMeta};
    use soql_compiler::soql_generator::{SalesforceDialect, SoqlCompiler};

    fn write_config(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", yaml).unwrap();
        file
    }

    fn opportunity_plan() -> QueryPlan {
        let mut plan = QueryPlan::new(TableMeta::new("Opportunity"));
        plan.alias_map = vec![
            JoinEdge::base("Opportunity", "O"),
            JoinEdge::join("O", "Account", ("AccountId", "Id"), "A"),
        ];
        plan.select = vec![
            SelectItem::new(ColumnExpr::col("O", "Amount")),
            SelectItem::new(ColumnExpr::col("A", "Name")),
        ];
        plan
    }

    fn compile(config: &CompilerConfig) -> String {
        let mut plan = opportunity_plan();
        let dialect = SalesforceDialect::new();
        SoqlCompiler::new(&mut plan, &dialect, config)
            .as_sql(true, false)
            .unwrap()
            .sql
    }

    #[test]
    fn test_minimal_alias_tables_from_file() {
        let file = write_config("minimal_alias_tables:\n  - Opportunity\n");
        let config = CompilerConfig::from_yaml_file(file.path()).unwrap();
        // only references into the listed table drop their qualifier
        assert_eq!(
            compile(&config),
            "SELECT Amount, Opportunity.Account.Name FROM Opportunity"
        );
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("{}\n");
        let config = CompilerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.target_version, TargetVersion::LATEST);
        assert_eq!(
            compile(&config),
            "SELECT Opportunity.Amount, Opportunity.Account.Name FROM Opportunity"
        );
    }

    #[test]
    fn test_cli_overrides_win_over_file() {
        let file = write_config("minimal_aliases: false\ntarget_version: \"5.0\"\n");
        let mut config = CompilerConfig::from_yaml_file(file.path()).unwrap();
        assert!(!config.capabilities().row_count_result);

        config
            .apply_cli(&CliOverrides {
                minimal_aliases: true,
                target_version: Some(TargetVersion::new(5, 2)),
                ..Default::default()
            })
            .unwrap();
        assert!(config.capabilities().row_count_result);
        assert_eq!(compile(&config), "SELECT Amount, Account.Name FROM Opportunity");
    }

    #[test]
    fn test_invalid_version_in_file() {
        let file = write_config("target_version: latest\n");
        assert!(CompilerConfig::from_yaml_file(file.path()).is_err());
    }
}

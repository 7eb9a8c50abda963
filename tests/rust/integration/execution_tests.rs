//! Integration tests for running compiled statements against a connection
//!
//! Uses an in-memory connection that serves canned rows and records every
//! call it receives.

#[cfg(test)]
mod execution_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use soql_compiler::config::CompilerConfig;
    use soql_compiler::query_plan::{
        ColumnExpr, JoinEdge, LookupKind, QueryOptions, QueryPlan, Row, SelectItem, SoqlValue,
        TableMeta, WhereChild, WhereNode,
    };
    use soql_compiler::soql_generator::{
        AggregateCommand, Connection, Cursor, DeleteCommand, InsertCommand, QueryResult,
        ResultType, SalesforceDialect, SoqlCompiler, SoqlResult,
    };

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct MemoryCursor {
        rows: Vec<Row>,
        position: usize,
        affected: i64,
        log: CallLog,
    }

    impl Cursor for MemoryCursor {
        fn prepare_query(&mut self, options: &QueryOptions) {
            self.log
                .borrow_mut()
                .push(format!("prepare query_all={}", options.query_all));
        }

        fn execute(&mut self, sql: &str, params: &[SoqlValue]) -> SoqlResult<()> {
            self.log
                .borrow_mut()
                .push(format!("execute {} ({} params)", sql, params.len()));
            Ok(())
        }

        fn fetchone(&mut self) -> SoqlResult<Option<Row>> {
            let row = self.rows.get(self.position).cloned();
            if row.is_some() {
                self.position += 1;
            }
            Ok(row)
        }

        fn fetchmany(&mut self, size: usize) -> SoqlResult<Vec<Row>> {
            let end = (self.position + size).min(self.rows.len());
            let batch = self.rows[self.position..end].to_vec();
            self.position = end;
            Ok(batch)
        }

        fn rowcount(&self) -> i64 {
            self.affected
        }

        fn last_insert_id(&mut self) -> SoqlResult<Option<SoqlValue>> {
            Ok(None)
        }

        fn close(&mut self) {
            self.log.borrow_mut().push("close".to_string());
        }
    }

    struct MemoryConnection {
        rows: Vec<Row>,
        affected: i64,
        log: CallLog,
    }

    impl MemoryConnection {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                affected: rows.len() as i64,
                rows,
                log: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    impl Connection for MemoryConnection {
        fn cursor(&self) -> SoqlResult<Box<dyn Cursor>> {
            Ok(Box::new(MemoryCursor {
                rows: self.rows.clone(),
                position: 0,
                affected: self.affected,
                log: Rc::clone(&self.log),
            }))
        }
    }

    fn names(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| vec![SoqlValue::from(format!("Contact {}", i))])
            .collect()
    }

    fn contact_plan() -> QueryPlan {
        let mut plan = QueryPlan::new(TableMeta::new("Contact"));
        plan.alias_map = vec![JoinEdge::base("Contact", "Contact")];
        plan.select = vec![SelectItem::new(ColumnExpr::col("Contact", "Name"))];
        plan
    }

    #[test]
    fn test_multi_result_is_streamed_in_chunks() {
        let mut plan = contact_plan();
        plan.options.query_all = true;
        let config = CompilerConfig {
            chunk_size: 2,
            ..Default::default()
        };
        let dialect = SalesforceDialect::new();
        let connection = MemoryConnection::with_rows(names(5));

        let result = SoqlCompiler::new(&mut plan, &dialect, &config)
            .execute(&connection, ResultType::Multi)
            .unwrap();
        let QueryResult::Chunks(chunks) = result else {
            panic!("expected a chunked result");
        };
        let sizes: Vec<usize> = chunks.map(|chunk| chunk.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(
            connection.calls(),
            vec![
                "prepare query_all=true".to_string(),
                "execute SELECT Contact.Name FROM Contact (0 params)".to_string(),
                "close".to_string(),
            ]
        );
    }

    #[test]
    fn test_single_and_cursor_results() {
        let mut plan = contact_plan();
        let config = CompilerConfig::default();
        let dialect = SalesforceDialect::new();
        let connection = MemoryConnection::with_rows(names(3));

        let mut compiler = SoqlCompiler::new(&mut plan, &dialect, &config);
        let single = compiler.execute(&connection, ResultType::Single).unwrap();
        assert_eq!(single.into_rows().unwrap(), names(1));

        let QueryResult::Cursor(mut cursor) = compiler.execute(&connection, ResultType::Cursor).unwrap()
        else {
            panic!("expected the open cursor");
        };
        assert_eq!(cursor.fetchmany(10).unwrap().len(), 3);
        cursor.close();
    }

    #[test]
    fn test_row_count_result() {
        let mut plan = contact_plan();
        let config = CompilerConfig::default();
        let dialect = SalesforceDialect::new();
        let connection = MemoryConnection::with_rows(names(4));
        let result = SoqlCompiler::new(&mut plan, &dialect, &config)
            .execute(&connection, ResultType::RowCount)
            .unwrap();
        assert!(matches!(result, QueryResult::RowCount(4)));
    }

    #[test]
    fn test_delete_reports_affected_rows() {
        let mut plan = contact_plan();
        plan.where_node = Some(WhereNode::and(vec![WhereChild::lookup(
            ColumnExpr::col("Contact", "LastName"),
            LookupKind::EndsWith,
            "son",
        )]));
        let config = CompilerConfig::default();
        let dialect = SalesforceDialect::new();
        let connection = MemoryConnection::with_rows(names(2));

        let deleted = DeleteCommand::new(&plan, &dialect, &config)
            .execute_sql(&connection)
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(connection
            .calls()
            .contains(&"execute DELETE FROM Contact WHERE Contact.LastName LIKE %s (1 params)".to_string()));
    }

    #[test]
    fn test_aggregate_returns_single_row() {
        let plan = contact_plan();
        let config = CompilerConfig::default();
        let dialect = SalesforceDialect::new();
        let connection = MemoryConnection::with_rows(vec![vec![SoqlValue::Integer(42)]]);

        let row = AggregateCommand::new(
            &plan,
            vec![SelectItem::aliased(ColumnExpr::CountAll, "total")],
            &dialect,
            &config,
        )
        .execute_sql(&connection)
        .unwrap();
        assert_eq!(row, Some(vec![SoqlValue::Integer(42)]));
    }

    #[test]
    fn test_bulk_insert_returns_new_ids() {
        let table = TableMeta::new("Contact");
        let config = CompilerConfig::default();
        let dialect = SalesforceDialect::new();
        let ids = vec![vec![SoqlValue::from("003A")], vec![SoqlValue::from("003B")]];
        let connection = MemoryConnection::with_rows(ids.clone());

        let insert = InsertCommand::new(
            &table,
            vec!["LastName".to_string()],
            vec![vec![SoqlValue::from("Doe")], vec![SoqlValue::from("Roe")]],
            &dialect,
            &config,
        );
        let rows = insert
            .execute_sql(&connection, &["Id".to_string()])
            .unwrap();
        assert_eq!(rows, ids);
        assert_eq!(
            connection.calls()[1],
            "execute INSERT INTO Contact (LastName) VALUES (%s), (%s) (2 params)"
        );
    }
}

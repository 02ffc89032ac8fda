//! Round trip against a real MySQL server and real client tools.
//!
//! Reads connection settings from the environment (`DB_HOST`, `DB_USER`,
//! `DB_PASSWORD`, `DB_NAME`, ...). The target database is dropped and
//! recreated, so point `DB_NAME` at a scratch database.
//!
//! ```text
//! DB_NAME=benchvault_scratch cargo test -p benchvault-infra --test live_mysql -- --ignored
//! ```

use benchvault_core::{BackupOptions, RestoreOptions};
use benchvault_infra::tools::{resolve_tool, ToolInvocation, ToolKind};
use benchvault_infra::{BackupConfig, BackupService};

const TABLES: [(&str, u32); 3] = [("customers", 3), ("repairs", 5), ("payments", 2)];

/// Run one statement with the client tool, returning tab-separated rows.
async fn sql(config: &BackupConfig, database: Option<&str>, statement: &str) -> Vec<String> {
    let client = resolve_tool(ToolKind::Client, config.client_tool.as_deref()).unwrap();
    let conn = &config.connection;
    let output = ToolInvocation::connect(&client, conn)
        .password(conn.password())
        .args(["-N", "-B"])
        .args(database)
        .args(["-e", statement])
        .timeout(config.tool_timeout)
        .run()
        .await
        .unwrap();
    output.stdout.lines().map(str::to_string).collect()
}

async fn tables(config: &BackupConfig) -> Vec<String> {
    let mut names = sql(config, Some(config.connection.database.as_str()), "SHOW TABLES").await;
    names.sort();
    names
}

async fn row_count(config: &BackupConfig, table: &str) -> u32 {
    let rows = sql(
        config,
        Some(config.connection.database.as_str()),
        &format!("SELECT COUNT(*) FROM `{table}`"),
    )
    .await;
    rows[0].trim().parse().unwrap()
}

async fn seed(config: &BackupConfig) {
    let db = &config.connection.database;
    sql(config, None, &format!("DROP DATABASE IF EXISTS `{db}`")).await;
    sql(config, None, &format!("CREATE DATABASE `{db}`")).await;
    for (table, rows) in TABLES {
        let values: Vec<String> = (1..=rows).map(|i| format!("({i}, 'row {i}')")).collect();
        let statement = format!(
            "CREATE TABLE `{table}` (id INT PRIMARY KEY, label VARCHAR(32)); \
             INSERT INTO `{table}` VALUES {};",
            values.join(", ")
        );
        sql(config, Some(db.as_str()), &statement).await;
    }
}

#[tokio::test]
#[ignore = "requires a running MySQL server and mysqldump/mysql on PATH"]
async fn backup_restore_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = BackupConfig::from_env()
        .unwrap()
        .with_backup_dir(dir.path());
    seed(&config).await;
    let service = BackupService::open(config.clone());

    let record = service
        .create_backup(BackupOptions::named("live round trip"))
        .await
        .unwrap();
    assert!(record.size > 0);

    // Drift after the backup: an extra table and an extra row.
    sql(
        &config,
        Some(config.connection.database.as_str()),
        "CREATE TABLE scratch (id INT); INSERT INTO customers VALUES (99, 'late');",
    )
    .await;

    let outcome = service
        .restore_backup(
            record.id,
            RestoreOptions {
                drop_database: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(outcome.success);

    let mut expected: Vec<String> = TABLES.iter().map(|(t, _)| t.to_string()).collect();
    expected.sort();
    assert_eq!(tables(&config).await, expected);
    for (table, rows) in TABLES {
        assert_eq!(row_count(&config, table).await, rows, "{table}");
    }

    service.delete_backup(record.id).await.unwrap();
    assert!(service.delete_backup(record.id).await.unwrap_err().is_not_found());
}

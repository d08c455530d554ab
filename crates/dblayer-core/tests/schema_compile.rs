//! DDL compilation across dialects.

use dblayer_core::{
    AddColumns, AlterTable, Ddl, Dialect, DropTable, ForeignKeyAction, TableBuilder,
    TruncateTable,
};

fn posts() -> TableBuilder {
    let mut t = TableBuilder::new("posts");
    t.id();
    t.string("slug", 120).unique();
    t.string("title", 200);
    t.text("body").nullable();
    t.big_integer("user_id").unsigned();
    t.boolean("published").default(false);
    t.timestamps();
    t.index("idx_posts_user", &["user_id"]);
    t.foreign_key("user_id", "users", "id")
        .on_delete(ForeignKeyAction::Cascade)
        .add();
    t
}

#[test]
fn create_table_mysql() {
    let sql = posts().to_statements(Dialect::MySql).unwrap();
    assert_eq!(sql.len(), 1);
    let create = &sql[0];
    assert!(create.starts_with("CREATE TABLE `posts` (\n    `id` BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,"));
    assert!(create.contains("`slug` VARCHAR(120) NOT NULL UNIQUE"));
    assert!(create.contains("`body` TEXT,"));
    assert!(create.contains("`user_id` BIGINT UNSIGNED NOT NULL"));
    assert!(create.contains("`published` TINYINT(1) NOT NULL DEFAULT 0"));
    assert!(create.contains("`created_at` TIMESTAMP,"));
    assert!(create.contains("INDEX `idx_posts_user` (`user_id`)"));
    assert!(create.ends_with(
        "FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE\n)"
    ));
}

#[test]
fn create_table_postgres() {
    let sql = posts().to_statements(Dialect::Postgres).unwrap();
    assert_eq!(sql.len(), 2);
    assert!(sql[0].contains(r#""id" BIGSERIAL PRIMARY KEY"#));
    assert!(sql[0].contains(r#""published" BOOLEAN NOT NULL DEFAULT FALSE"#));
    assert!(!sql[0].contains("AUTO_INCREMENT"));
    assert!(!sql[0].contains("UNSIGNED"));
    assert_eq!(
        sql[1],
        r#"CREATE INDEX "idx_posts_user" ON "posts" ("user_id")"#
    );
}

#[test]
fn create_table_sqlite() {
    let sql = posts().to_statements(Dialect::Sqlite).unwrap();
    assert!(sql[0].contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#));
    assert!(sql[0].contains(r#""user_id" INTEGER NOT NULL"#));
    assert_eq!(sql.len(), 2);
}

#[test]
fn sqlite_autoincrement_needs_inline_primary_key() {
    let mut t = TableBuilder::new("bad");
    t.integer("a").auto_increment();
    t.integer("b");
    t.primary_key(&["a", "b"]);
    assert!(t.to_statements(Dialect::Sqlite).is_err());
    assert!(t.to_statements(Dialect::MySql).is_ok());
}

#[test]
fn drop_options_render_only_where_supported() {
    let drop = DropTable::new(&["a", "b"])
        .if_exists()
        .cascade()
        .restrict()
        .temporary()
        .concurrent()
        .force();
    assert_eq!(
        drop.to_statements(Dialect::MySql).unwrap(),
        vec!["DROP TEMPORARY TABLE IF EXISTS `a`, `b`"]
    );
    assert_eq!(
        drop.to_statements(Dialect::Postgres).unwrap(),
        vec![r#"DROP TABLE IF EXISTS "a", "b" CASCADE"#]
    );
    assert_eq!(
        drop.to_statements(Dialect::Sqlite).unwrap(),
        vec![r#"DROP TABLE IF EXISTS "a", "b""#]
    );
}

#[test]
fn drop_is_stable_across_calls() {
    let drop = DropTable::new(&["logs"]).if_exists();
    for dialect in Dialect::ALL {
        assert_eq!(drop.to_sql(dialect).unwrap(), drop.to_sql(dialect).unwrap());
    }
}

#[test]
fn truncate_per_dialect() {
    let truncate = TruncateTable::new(&["a", "b"]).restart_identity().cascade();
    assert_eq!(
        truncate.to_statements(Dialect::Postgres).unwrap(),
        vec![r#"TRUNCATE TABLE "a", "b" RESTART IDENTITY CASCADE"#]
    );
    assert_eq!(
        truncate.to_statements(Dialect::MySql).unwrap(),
        vec!["TRUNCATE TABLE `a`", "TRUNCATE TABLE `b`"]
    );
    assert_eq!(
        truncate.to_statements(Dialect::Sqlite).unwrap(),
        vec![r#"DELETE FROM "a""#, r#"DELETE FROM "b""#]
    );
}

#[test]
fn forced_truncate_resets_fk_checks_as_cleanup() {
    let truncate = TruncateTable::new(&["a"]).force();
    assert_eq!(
        truncate.to_statements(Dialect::MySql).unwrap(),
        vec!["SET FOREIGN_KEY_CHECKS = 0", "TRUNCATE TABLE `a`"]
    );
    assert_eq!(
        truncate.cleanup_statements(Dialect::MySql),
        vec!["SET FOREIGN_KEY_CHECKS = 1"]
    );
    assert!(truncate.cleanup_statements(Dialect::Sqlite).is_empty());
}

#[test]
fn alter_table_per_dialect() {
    let mut alter = AlterTable::new("users");
    alter.string("phone", 20).nullable();
    alter.drop_column("fax");
    alter.rename_column("name", "full_name");

    assert_eq!(
        alter.to_statements(Dialect::MySql).unwrap(),
        vec![
            "ALTER TABLE `users` ADD COLUMN `phone` VARCHAR(20), DROP COLUMN `fax`, \
             RENAME COLUMN `name` TO `full_name`"
        ]
    );
    assert_eq!(
        alter.to_statements(Dialect::Postgres).unwrap(),
        vec![
            r#"ALTER TABLE "users" ADD COLUMN "phone" VARCHAR(20), DROP COLUMN "fax""#,
            r#"ALTER TABLE "users" RENAME COLUMN "name" TO "full_name""#,
        ]
    );
    assert_eq!(alter.to_statements(Dialect::Sqlite).unwrap().len(), 3);
}

#[test]
fn identifiers_in_ddl_are_validated() {
    let mut t = TableBuilder::new("users; DROP TABLE x");
    t.id();
    assert!(t.to_statements(Dialect::MySql).is_err());

    assert!(DropTable::new(&["a b"]).to_sql(Dialect::Postgres).is_err());
}

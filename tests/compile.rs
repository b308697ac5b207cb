//! End-to-end: schema text in, SQL out.

use avant::prelude::*;
use avant::record;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

const SCHEMA: &str = "schema User {\r\n  id string $id\r\n  email string $unique\r\n  name string? $default('Unknown')\r\n  role *Role $relation(fields: [roleId], references: [id])\r\n  roleId string\r\n  age number\r\n  joined Date $default(now())\r\n}\r\n\r\nschema Role {\r\n  id string $id\r\n  name string\r\n  user *User[] $relation(fields: [id], references: [roleId])\r\n}";

fn client() -> Client {
    Client::from_schema(SCHEMA, "BLACK_").unwrap()
}

fn squash(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn date() -> Value {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(8, 9, 10)
        .unwrap()
        .into()
}

#[test]
fn test_find_many_without_request_on_every_table() {
    let client = client();
    for model in client.models() {
        let table = client.table(model).unwrap();
        assert_eq!(
            table.find_many(None).unwrap(),
            format!("SELECT * FROM {}", table.name())
        );
    }
}

#[test]
fn test_find_unique_by_email() {
    let users = client();
    let users = users.table("User").unwrap();
    let sql = users
        .find_unique(&FindArgs::new().filter("email", "a@b.com"))
        .unwrap();
    assert_eq!(squash(&sql), "SELECT * FROM BLACK_USER WHERE EMAIL = 'a@b.com'");
    assert_eq!(sql.matches('\'').count(), 2);
}

#[test]
fn test_find_unique_without_unique_column() {
    let client = client();
    let users = client.table("User").unwrap();
    let err = users
        .find_unique(&FindArgs::new().filter("name", "Ann").filter("age", 3))
        .unwrap_err();
    assert!(matches!(err, AvantError::NotUniqueFilter { .. }));
}

#[test]
fn test_create_fills_defaults() {
    let client = client();
    let users = client.table("User").unwrap();
    let sql = users.create(&record! { "email" => "x@y.com" }).unwrap();
    assert_eq!(
        sql,
        "INSERT INTO BLACK_USER (email, name, joined) VALUES ('x@y.com', 'Unknown', now());"
    );
}

#[test]
fn test_date_literal_in_every_context() {
    let client = client();
    let users = client.table("User").unwrap();
    let literal = "'2024-03-05 08:09:10'";

    let sql = users.create(&record! { "joined" => date() }).unwrap();
    assert!(sql.contains(literal), "{}", sql);

    let update = UpdateArgs {
        filter: WhereMap::from([("id".to_string(), FilterExpr::from("u1"))]),
        data: record! { "joined" => date() },
    };
    let sql = users.update(&update).unwrap();
    assert!(sql.contains(&format!("joined={}", literal)), "{}", sql);

    let sql = users
        .find_many(Some(&FindArgs::new().filter("joined", date())))
        .unwrap();
    assert!(sql.contains(&format!("JOINED = {}", literal)), "{}", sql);
}

#[test]
fn test_order_by_nulls_last() {
    let client = client();
    let users = client.table("User").unwrap();
    let query: Query = serde_json::from_str(
        r#"{"op": "findMany", "args": {"orderBy": {"age": {"sort": "desc", "nulls": "last"}}}}"#,
    )
    .unwrap();
    let sql = users.compile(&query).unwrap();
    assert!(
        sql.ends_with("ORDER BY CASE WHEN AGE IS NULL THEN 1 ELSE 0 END, AGE desc"),
        "{}",
        sql
    );
}

#[test]
fn test_json_request_end_to_end() {
    let query: Query = serde_json::from_str(
        r#"{
            "op": "findMany",
            "args": {
                "take": 5,
                "skip": 10,
                "select": {"email": true, "age": true},
                "include": {"role": true},
                "where": {"age": {"gte": 18, "lt": 65}, "joined": {"gt": "2024-03-05T08:09:10"}},
                "orderBy": {"email": "asc"}
            }
        }"#,
    )
    .unwrap();
    let sql = client().compile("User", &query).unwrap();
    assert_eq!(
        sql,
        "SELECT FIRST 5 SKIP 10 BLACK_USER.EMAIL, BLACK_USER.AGE FROM BLACK_USER \
         LEFT JOIN BLACK_ROLE ON BLACK_USER.roleId = BLACK_ROLE.id \
         WHERE BLACK_USER.AGE >= 18 AND BLACK_USER.AGE < 65 \
         AND BLACK_USER.JOINED > '2024-03-05 08:09:10' \
         ORDER BY BLACK_USER.EMAIL asc"
    );
}

#[test]
fn test_delete_does_not_need_unique_column() {
    let query: Query =
        serde_json::from_str(r#"{"op": "delete", "args": {"where": {"name": {"startsWith": "tmp"}}}}"#)
            .unwrap();
    let sql = client().compile("User", &query).unwrap();
    assert_eq!(sql, "DELETE FROM BLACK_USER WHERE NAME LIKE 'tmp%'");
}

#[test]
fn test_create_many_from_json() {
    let query: Query = serde_json::from_str(
        r#"{"op": "createMany", "args": [{"id": "r1", "name": "admin"}, {"id": "r2", "name": "user"}]}"#,
    )
    .unwrap();
    let sql = client().compile("Role", &query).unwrap();
    assert_eq!(
        sql,
        "INSERT INTO BLACK_ROLE (id, name) VALUES ('r1', 'admin'), ('r2', 'user');"
    );
}

#[test]
fn test_same_request_twice() {
    let client = client();
    let query = Query::FindMany(Some(
        FindArgs::new()
            .filter("age", FilterExpr::op(FilterOp::Between, vec![1, 9]))
            .include("role")
            .take(2),
    ));
    let first = client.compile("User", &query).unwrap();
    let second = client.compile("User", &query).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_registry_is_deterministic() {
    let a = Registry::parse(SCHEMA, "BLACK_").unwrap();
    let b = Registry::parse(SCHEMA, "BLACK_").unwrap();
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    assert_eq!(a.models(), b.models());
}

#[test]
fn test_prefix_is_threaded_through() {
    let client = Client::from_schema(SCHEMA, "").unwrap();
    let sql = client
        .compile("User", &Query::FindMany(Some(FindArgs::new().include("role"))))
        .unwrap();
    assert_eq!(sql, "SELECT * FROM USER LEFT JOIN ROLE ON USER.roleId = ROLE.id");
}

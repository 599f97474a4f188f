//! Delimiter-level SQL helpers
//!
//! No parsing happens here: statements are classified by their leading
//! keyword and predicates are spliced in front of the first trailing clause.
//! A `where` that only appears inside a string literal or an identifier is
//! taken for the keyword, which produces an `and` join on a statement that
//! has no `WHERE` clause.

const DML_KEYWORDS: [&str; 3] = ["insert", "update", "delete"];

/// Clauses that must stay after an injected predicate
const TRAILING_CLAUSES: [&str; 4] = [" group by", " order by", " limit", " for update"];

const KW_WHERE_TOKEN: &str = "where";
const KW_AND: &str = " and ";
const KW_WHERE: &str = " where ";

/// Whether the statement mutates data (INSERT, UPDATE or DELETE)
pub fn is_dml(query_sql: &str) -> bool {
    query_sql
        .split_whitespace()
        .next()
        .map(|keyword| DML_KEYWORDS.iter().any(|dml| keyword.eq_ignore_ascii_case(dml)))
        .unwrap_or(false)
}

/// Add `clause` as a predicate of `query_sql`.
///
/// The clause lands before the first of GROUP BY, ORDER BY, LIMIT and
/// FOR UPDATE (or at the end), joined with `and` when the statement already
/// has a `where`, with `where` otherwise.
pub fn insert_sql_clause(query_sql: &str, clause: &str) -> String {
    // ASCII lowering keeps byte offsets valid in the original statement
    let sql = query_sql.to_ascii_lowercase();

    let idx_extra = TRAILING_CLAUSES
        .iter()
        .filter_map(|keyword| sql.find(keyword))
        .filter(|idx| *idx > 0)
        .min()
        .unwrap_or(sql.len());

    let joiner = if sql.contains(KW_WHERE_TOKEN) {
        KW_AND
    } else {
        KW_WHERE
    };

    let mut out = String::with_capacity(query_sql.len() + joiner.len() + clause.len());
    out.push_str(&query_sql[..idx_extra]);
    out.push_str(joiner);
    out.push_str(clause);
    out.push_str(&query_sql[idx_extra..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dml() {
        assert!(is_dml("INSERT INTO t values (1)"));
        assert!(is_dml("update t set a = 1"));
        assert!(is_dml("Delete from t"));
        assert!(is_dml("  delete from t"));

        assert!(!is_dml("SELECT 1"));
        assert!(!is_dml("insertion into t"));
        assert!(!is_dml(""));
        assert!(!is_dml("   "));
        assert!(!is_dml("select * from t where a = 'insert'"));
    }

    #[test]
    fn test_insert_with_existing_where() {
        assert_eq!(
            insert_sql_clause("select * from t where a=1 order by b", "id in (:id0)"),
            "select * from t where a=1 and id in (:id0) order by b"
        );
    }

    #[test]
    fn test_insert_without_where() {
        assert_eq!(
            insert_sql_clause("select * from t", "id in (:id0)"),
            "select * from t where id in (:id0)"
        );
        assert_eq!(
            insert_sql_clause("select * from t limit 10", "id in (:id0)"),
            "select * from t where id in (:id0) limit 10"
        );
    }

    #[test]
    fn test_insert_before_earliest_trailing_clause() {
        assert_eq!(
            insert_sql_clause(
                "select a, count(*) from t group by a order by a limit 5",
                "id in (:id0, :id1)"
            ),
            "select a, count(*) from t where id in (:id0, :id1) group by a order by a limit 5"
        );
        assert_eq!(
            insert_sql_clause("select * from t where a = 1 for update", "id in (:id0)"),
            "select * from t where a = 1 and id in (:id0) for update"
        );
    }

    #[test]
    fn test_insert_keeps_original_case() {
        assert_eq!(
            insert_sql_clause("SELECT * FROM T WHERE A=1 ORDER BY B LIMIT 3", "id in (:id0)"),
            "SELECT * FROM T WHERE A=1 and id in (:id0) ORDER BY B LIMIT 3"
        );
    }

    #[test]
    fn test_where_inside_literal_is_taken_for_keyword() {
        assert_eq!(
            insert_sql_clause("select 'somewhere' from t", "id in (:id0)"),
            "select 'somewhere' from t and id in (:id0)"
        );
    }
}

use std::sync::OnceLock;

use regex::Regex;

/// Collapse whitespace in a query literal and rewrite `?` placeholders into
/// numbered Postgres `$n` parameters, so repository SQL can stay indented
/// and database-agnostic in source.
pub fn sql(query: &str) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\?").expect("valid placeholder regex"));

    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");

    let mut param_index = 0;
    re.replace_all(&cleaned, |_: &regex::Captures| {
        param_index += 1;
        format!("${}", param_index)
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        let query = sql("SELECT * FROM shifts WHERE station_id = ? AND status = ?");
        assert_eq!(
            query,
            "SELECT * FROM shifts WHERE station_id = $1 AND status = $2"
        );
    }

    #[test]
    fn collapses_whitespace() {
        let query = sql("UPDATE shifts\n            SET status = ?\n            WHERE id = ?");
        assert_eq!(query, "UPDATE shifts SET status = $1 WHERE id = $2");
    }
}

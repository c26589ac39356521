//! Delimited-text ingestion.
//!
//! Users file: a header row naming the columns, then one user per line.
//! `name` and `tweets` are required; years active come from a `years`
//! column or are derived from `created_at`. Other columns are ignored.
//!
//! ```text
//! id;name;tweets;created_at
//! 1;latercera;120340;"Tue Jun 02 20:12:29 +0000 2009"
//! ```
//!
//! Connections file: a header row, then `followee;follower` pairs.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate};
use hashbrown::HashSet;

use crate::config::EngineConfig;
use crate::model::User;
use crate::storage::FollowGraph;
use crate::trace::TraceSink;
use crate::{Error, Result};

/// Twitter API `created_at` layout.
const TWITTER_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

// ============================================================================
// Record splitting
// ============================================================================

/// Split one line on `delimiter`, honouring double-quoted fields (`""`
/// escapes a quote inside them).
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields.iter_mut().for_each(|f| *f = f.trim().to_string());
    fields
}

/// Non-blank lines with their 1-based line numbers, header excluded.
fn data_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|l| (i + 1, l)).map_err(Error::from))
        .filter(|entry| !matches!(entry, Ok((_, line)) if line.trim().is_empty()))
}

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::Parse { line, message: message.into() }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Tenure {
    Years(usize),
    CreatedAt(usize),
}

#[derive(Debug, Clone, Copy)]
struct UserColumns {
    name: usize,
    tweets: usize,
    tenure: Tenure,
}

impl UserColumns {
    fn from_header(header: &[String], line: usize) -> Result<Self> {
        let find = |column: &str| header.iter().position(|h| h.eq_ignore_ascii_case(column));
        let name = find("name").ok_or_else(|| parse_error(line, "users header lacks a 'name' column"))?;
        let tweets = find("tweets").ok_or_else(|| parse_error(line, "users header lacks a 'tweets' column"))?;
        let tenure = match (find("years"), find("created_at")) {
            (Some(col), _) => Tenure::Years(col),
            (None, Some(col)) => Tenure::CreatedAt(col),
            (None, None) => {
                return Err(parse_error(line, "users header needs a 'years' or 'created_at' column"));
            }
        };
        Ok(Self { name, tweets, tenure })
    }
}

/// Extract the calendar year from a plain year, an RFC 3339 timestamp, an
/// ISO date, or a Twitter-style timestamp.
pub fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if let Ok(year) = text.parse::<i32>() {
        return Some(year);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.year());
    }
    if let Ok(ts) = DateTime::parse_from_str(text, TWITTER_TIME_FORMAT) {
        return Some(ts.year());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(|d| d.year())
}

/// Parse a users file into [`User`] records in file order.
pub fn read_users<R: BufRead>(reader: R, config: &EngineConfig) -> Result<Vec<User>> {
    let mut lines = data_lines(reader);
    let Some(header) = lines.next().transpose()? else {
        return Ok(Vec::new());
    };
    let columns = UserColumns::from_header(&split_record(&header.1, config.delimiter), header.0)?;

    let mut users = Vec::new();
    let mut seen = HashSet::new();
    for entry in lines {
        let (line, text) = entry?;
        let fields = split_record(&text, config.delimiter);
        let field = |col: usize| {
            fields
                .get(col)
                .map(String::as_str)
                .ok_or_else(|| parse_error(line, format!("expected at least {} fields, found {}", col + 1, fields.len())))
        };

        let name = field(columns.name)?;
        if name.is_empty() {
            return Err(parse_error(line, "empty user name"));
        }
        if !seen.insert(name.to_string()) {
            return Err(parse_error(line, format!("duplicate user name '{name}'")));
        }
        let tweets: u64 = field(columns.tweets)?
            .parse()
            .map_err(|_| parse_error(line, format!("invalid tweet count '{}'", fields[columns.tweets])))?;
        let years_active = match columns.tenure {
            Tenure::Years(col) => field(col)?
                .parse::<u32>()
                .map_err(|_| parse_error(line, format!("invalid years '{}'", fields[col])))?,
            Tenure::CreatedAt(col) => {
                let raw = field(col)?;
                let year = parse_year(raw).ok_or_else(|| parse_error(line, format!("invalid created_at '{raw}'")))?;
                u32::try_from(config.reference_year.saturating_sub(year)).unwrap_or(0)
            }
        };

        users.push(User::new(name).with_activity(years_active, tweets));
    }
    Ok(users)
}

// ============================================================================
// Connections
// ============================================================================

/// A parsed `followee;follower` pair with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub line: usize,
    pub followee: String,
    pub follower: String,
}

pub fn read_connections<R: BufRead>(reader: R, delimiter: char) -> Result<Vec<Connection>> {
    let mut connections = Vec::new();
    for entry in data_lines(reader).skip(1) {
        let (line, text) = entry?;
        let mut fields = split_record(&text, delimiter).into_iter();
        match (fields.next(), fields.next()) {
            (Some(followee), Some(follower)) if !followee.is_empty() && !follower.is_empty() => {
                connections.push(Connection { line, followee, follower });
            }
            _ => return Err(parse_error(line, "expected 'followee;follower'")),
        }
    }
    Ok(connections)
}

// ============================================================================
// Graph loading
// ============================================================================

/// Insert users then connections. Stops at the first unknown name; edges
/// added before it stay.
pub fn populate(graph: &mut FollowGraph, users: Vec<User>, connections: &[Connection]) -> Result<()> {
    for user in users {
        graph.add_user(user)?;
    }
    for connection in connections {
        if let Err(err) = graph.connect(&connection.followee, &connection.follower) {
            tracing::warn!(line = connection.line, error = %err, "connection rejected");
            return Err(err);
        }
    }
    Ok(())
}

/// Build a graph from a users file and a connections file, pinning the
/// configured seeds.
pub fn load_graph(
    users_path: impl AsRef<Path>,
    connections_path: impl AsRef<Path>,
    config: &EngineConfig,
    trace: Arc<dyn TraceSink>,
) -> Result<FollowGraph> {
    let users = read_users(BufReader::new(File::open(users_path)?), config)?;
    let connections = read_connections(BufReader::new(File::open(connections_path)?), config.delimiter)?;

    let mut graph = FollowGraph::with_trace(trace);
    populate(&mut graph, users, &connections)?;
    let seeds = config.apply_seeds(&mut graph)?;

    tracing::info!(
        users = graph.len(),
        edges = graph.edge_count(),
        seeds,
        "follow graph loaded"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> EngineConfig {
        EngineConfig { reference_year: 2025, ..EngineConfig::default() }
    }

    #[test]
    fn test_split_record_quotes() {
        assert_eq!(split_record("a;\"b;c\";d", ';'), vec!["a", "b;c", "d"]);
        assert_eq!(split_record("\"say \"\"hi\"\"\";x", ';'), vec!["say \"hi\"", "x"]);
        assert_eq!(split_record("", ';'), vec![""]);
    }

    #[test]
    fn test_parse_year_formats() {
        assert_eq!(parse_year("2009"), Some(2009));
        assert_eq!(parse_year("Tue Jun 02 20:12:29 +0000 2009"), Some(2009));
        assert_eq!(parse_year("2012-03-04T05:06:07Z"), Some(2012));
        assert_eq!(parse_year("2015-01-31"), Some(2015));
        assert_eq!(parse_year("soon"), None);
    }

    #[test]
    fn test_read_users_with_created_at() {
        let text = "id;name;tweets;created_at\n\
                    1;alpha;100;\"Tue Jun 02 20:12:29 +0000 2009\"\n\
                    \n\
                    2;beta;5;2030\n";
        let users = read_users(text.as_bytes(), &config()).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "alpha");
        assert_eq!(users[0].tweet_count, 100);
        assert_eq!(users[0].years_active, 16);
        assert_eq!(users[1].years_active, 0);
    }

    #[test]
    fn test_read_users_with_years_column() {
        let text = "name;years;tweets\nalpha;3;10\n";
        let users = read_users(text.as_bytes(), &config()).unwrap();
        assert_eq!(users[0].years_active, 3);
        assert_eq!(users[0].impact(), 21.0);
    }

    #[test]
    fn test_read_users_errors_carry_line() {
        let text = "name;tweets;years\nalpha;many;3\n";
        let err = read_users(text.as_bytes(), &config()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));

        let err = read_users("name;years\n".as_bytes(), &config()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        let err = read_users("name;tweets;years\nalpha;1\n".as_bytes(), &config()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_read_users_rejects_duplicate_names() {
        let text = "name;tweets;years\na;1;1\nb;1;1\n\na;2;2\n";
        let err = read_users(text.as_bytes(), &config()).unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 5);
                assert!(message.contains("'a'"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_connections() {
        let text = "followee;follower\nA;B\n\nB;C\n";
        let connections = read_connections(text.as_bytes(), ';').unwrap();
        assert_eq!(
            connections,
            vec![
                Connection { line: 2, followee: "A".into(), follower: "B".into() },
                Connection { line: 4, followee: "B".into(), follower: "C".into() },
            ]
        );

        let err = read_connections("followee;follower\nA\n".as_bytes(), ';').unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_populate_stops_at_unknown_name() {
        let users = vec![User::new("A"), User::new("B")];
        let connections = vec![
            Connection { line: 2, followee: "A".into(), follower: "B".into() },
            Connection { line: 3, followee: "A".into(), follower: "Z".into() },
        ];
        let mut graph = FollowGraph::new();

        let err = populate(&mut graph, users, &connections).unwrap_err();

        assert!(matches!(err, Error::UnknownName(name) if name == "Z"));
        assert_eq!(graph.edge_count(), 1);
    }
}

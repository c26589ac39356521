//! Flat reports: the bias table, the component listing, and a JSON
//! rendering of both.
//!
//! ```text
//! FollowGraph → write_bias_table()  → biases.txt
//!             → write_components()  → components.txt
//!             → write_json_report() → report.json
//! ```

use std::io::Write;

use serde::Serialize;

use crate::algo::PropagationSummary;
use crate::model::*;
use crate::storage::FollowGraph;
use crate::Result;

const NAME_WIDTH: usize = 20;
const VALUE_WIDTH: usize = 12;
const VALUE_PRECISION: usize = 10;

/// Fixed-width table of every user's bias, in insertion order.
pub fn write_bias_table(users: &[User], writer: &mut dyn Write) -> Result<()> {
    write!(writer, "| {:<NAME_WIDTH$} |", "NAME")?;
    for category in Category::ALL {
        write!(writer, " {:<VALUE_WIDTH$} |", category.label())?;
    }
    writeln!(writer)?;

    for user in users {
        write!(writer, "| {:<NAME_WIDTH$} |", user.name)?;
        for weight in user.bias.weights() {
            write!(writer, " {:<VALUE_WIDTH$.VALUE_PRECISION$} |", weight)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Numbered listing of components, members in discovery order.
pub fn write_components(components: &[Vec<&User>], writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "SCCs: {}", components.len())?;
    writeln!(writer)?;

    for (i, component) in components.iter().enumerate() {
        writeln!(writer, "[{}]", i + 1)?;
        for user in component {
            writeln!(writer, " * {}", user.name)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct UserReport<'a> {
    name: &'a str,
    years_active: u32,
    tweet_count: u64,
    follower_count: u64,
    followee_count: u64,
    impact: f64,
    bias: Bias,
    dominant: Category,
}

#[derive(Debug, Serialize)]
struct GraphReport<'a> {
    users: Vec<UserReport<'a>>,
    components: Vec<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    propagation: Option<&'a PropagationSummary>,
}

/// Users, biases, and components as one pretty-printed JSON document.
pub fn write_json_report(
    graph: &FollowGraph,
    propagation: Option<&PropagationSummary>,
    writer: &mut dyn Write,
) -> Result<()> {
    let users = graph
        .users()
        .iter()
        .map(|user| UserReport {
            name: &user.name,
            years_active: user.years_active,
            tweet_count: user.tweet_count,
            follower_count: user.follower_count,
            followee_count: user.followee_count,
            impact: user.impact(),
            bias: user.bias,
            dominant: user.bias.dominant(),
        })
        .collect();
    let components = graph
        .strongly_connected_components()
        .into_iter()
        .map(|component| component.into_iter().map(|user| user.name.as_str()).collect())
        .collect();

    let report = GraphReport { users, components, propagation };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_table_layout() {
        let users = vec![User::new("Ada").with_bias(Bias::pinned(Category::Center))];
        let mut out = Vec::new();
        write_bias_table(&users, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "| NAME                 | LEFT         | RIGHT        | CENTER       | LIBERTARIAN  |"
        );
        assert_eq!(
            lines[1],
            "| Ada                  | 0.0000000000 | 0.0000000000 | 1.0000000000 | 0.0000000000 |"
        );
    }

    #[test]
    fn test_components_listing() {
        let a = User::new("a");
        let b = User::new("b");
        let c = User::new("c");
        let components = vec![vec![&a, &b], vec![&c]];
        let mut out = Vec::new();
        write_components(&components, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "SCCs: 2\n\n[1]\n * a\n * b\n\n[2]\n * c\n\n"
        );
    }

    #[test]
    fn test_json_report() {
        let mut graph = FollowGraph::new();
        graph.add_user(User::new("a")).unwrap();
        graph.add_user(User::new("b")).unwrap();
        graph.connect("a", "b").unwrap();

        let mut out = Vec::new();
        write_json_report(&graph, None, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["users"].as_array().unwrap().len(), 2);
        assert_eq!(value["users"][0]["follower_count"], 1);
        assert_eq!(value["users"][1]["bias"][0], 0.25);
        assert_eq!(value["components"].as_array().unwrap().len(), 2);
        assert!(value.get("propagation").is_none());
    }
}

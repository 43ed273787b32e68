//! Atlassian Document Format (ADF) builder for roster comments.
//!
//! Produces the `{"type":"doc","version":1,"content":[...]}` body accepted by
//! `POST /rest/api/3/issue/{key}/comment`: a heading per role, then a
//! table whose first row is the header.

use serde::Serialize;

use crate::aggregate::{GroupMembership, Role, Roster};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfDocument {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u8,
    pub content: Vec<AdfNode>,
}

impl AdfDocument {
    pub fn new(content: Vec<AdfNode>) -> Self {
        Self {
            kind: "doc",
            version: 1,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AdfNode {
    Heading { attrs: HeadingAttrs, content: Vec<AdfNode> },
    Paragraph { content: Vec<AdfNode> },
    Text { text: String },
    Table { content: Vec<AdfNode> },
    TableRow { content: Vec<AdfNode> },
    TableHeader { content: Vec<AdfNode> },
    TableCell { content: Vec<AdfNode> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

pub fn text(value: &str) -> AdfNode {
    AdfNode::Text {
        text: value.to_string(),
    }
}

/// ADF rejects empty text nodes, so an empty string becomes an empty paragraph.
pub fn paragraph(value: &str) -> AdfNode {
    let content = if value.is_empty() {
        Vec::new()
    } else {
        vec![text(value)]
    };
    AdfNode::Paragraph { content }
}

pub fn heading(level: u8, value: &str) -> AdfNode {
    AdfNode::Heading {
        attrs: HeadingAttrs { level },
        content: vec![text(value)],
    }
}

/// Build a table node from a header row and data rows of equal width.
pub fn table(header: &[&str], rows: &[Vec<String>]) -> AdfNode {
    let mut content = Vec::with_capacity(rows.len() + 1);
    content.push(AdfNode::TableRow {
        content: header
            .iter()
            .map(|h| AdfNode::TableHeader {
                content: vec![paragraph(h)],
            })
            .collect(),
    });
    for row in rows {
        content.push(AdfNode::TableRow {
            content: row
                .iter()
                .map(|cell| AdfNode::TableCell {
                    content: vec![paragraph(cell)],
                })
                .collect(),
        });
    }
    AdfNode::Table { content }
}

/// Render the roster as an ADF comment: Managers, Contributors, Viewers in
/// that order, with a Groups column when `membership` is given.
pub fn roster_document(roster: &Roster, membership: Option<&GroupMembership>) -> AdfDocument {
    let header: &[&str] = if membership.is_some() {
        &["Name", "Email", "Groups"]
    } else {
        &["Name", "Email"]
    };

    let mut content = Vec::new();
    for role in Role::ALL {
        content.push(heading(3, role.title()));
        let rows: Vec<Vec<String>> = roster
            .sorted(role)
            .into_iter()
            .map(|entry| {
                let mut row = vec![entry.display_name.clone(), entry.display_email().to_string()];
                if let Some(index) = membership {
                    row.push(index.groups_label(&entry.account_id));
                }
                row
            })
            .collect();
        content.push(table(header, &rows));
    }
    AdfDocument::new(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_serialises_header_then_rows() {
        let node = table(&["Name", "Email"], &[vec!["Ada".into(), "ada@example.com".into()]]);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "table");
        assert_eq!(value["content"][0]["type"], "tableRow");
        assert_eq!(value["content"][0]["content"][0]["type"], "tableHeader");
        assert_eq!(
            value["content"][1]["content"][1]["content"][0]["content"][0],
            json!({"type": "text", "text": "ada@example.com"})
        );
    }

    #[test]
    fn empty_cell_has_no_text_node() {
        let value = serde_json::to_value(paragraph("")).unwrap();
        assert_eq!(value, json!({"type": "paragraph", "content": []}));
    }

    #[test]
    fn document_has_doc_envelope() {
        let value = serde_json::to_value(AdfDocument::new(vec![heading(2, "Managers")])).unwrap();
        assert_eq!(value["type"], "doc");
        assert_eq!(value["version"], 1);
        assert_eq!(value["content"][0]["attrs"]["level"], 2);
    }
}

//! Document to tree
//!
//! Both schemas go through the tree's own `add_node` / `add_edge` /
//! `set_root`, so a loaded tree satisfies the same invariants as an edited
//! one. Children are built before the edge to their parent is added.

use std::str::FromStr;

use tracing::{debug, instrument};

use crate::domain::{AttackTree, ConjunctionType, Meta, Node, NodeId, NodeKind};
use crate::infrastructure::xml::dom::{self, Element};
use crate::infrastructure::xml::error::{CodecError, CodecResult};

const THREAT: &str = "threat";
const COUNTERMEASURE: &str = "countermeasure";

#[instrument(level = "debug", skip_all)]
pub(crate) fn decode(text: &str) -> CodecResult<AttackTree> {
    let document = dom::parse(text)?;
    if document.name != "attackTree" {
        return Err(CodecError::schema(format!(
            "unexpected document element <{}>",
            document.name
        )));
    }
    let meta = document
        .child("meta")
        .ok_or_else(|| CodecError::schema("missing <meta>"))?;

    let mut tree = AttackTree::with_meta(read_meta(meta));
    if let Some(body) = document.child("tree") {
        decode_simple(&mut tree, body)?;
        tree.set_extended(false);
    } else if document.child("threats").is_some() {
        decode_extended(&mut tree, &document, meta)?;
        tree.set_extended(true);
    } else {
        return Err(CodecError::schema("neither <tree> nor <threats> present"));
    }
    tree.release_reserved();
    debug!(
        "decoded {} nodes, {} edges, extended={}",
        tree.len(),
        tree.edges().len(),
        tree.is_extended()
    );
    Ok(tree)
}

fn read_meta(meta: &Element) -> Meta {
    Meta {
        title: meta.child_text("title").to_string(),
        author: meta.child_text("author").to_string(),
        date: meta.child_text("date").to_string(),
        description: meta.child_text("description").to_string(),
    }
}

fn conjunction_type(name: &str) -> Option<ConjunctionType> {
    ConjunctionType::from_str(name).ok()
}

fn canonical_id(raw: &str) -> CodecResult<NodeId> {
    let id = NodeId::new(raw.trim());
    if !id.is_canonical() {
        return Err(CodecError::schema(format!("non-canonical node ID '{raw}'")));
    }
    Ok(id)
}

fn required_id(element: &Element) -> CodecResult<NodeId> {
    let raw = element
        .attr("id")
        .ok_or_else(|| CodecError::schema(format!("<{}> without id", element.name)))?;
    canonical_id(raw)
}

fn check_children(element: &Element, allowed: &[&str]) -> CodecResult<()> {
    match element
        .children
        .iter()
        .find(|c| !allowed.contains(&c.name.as_str()))
    {
        Some(unknown) => Err(CodecError::schema(format!(
            "unexpected <{}> in <{}>",
            unknown.name, element.name
        ))),
        None => Ok(()),
    }
}

/// Title, description and attributes of a concrete element.
fn concrete_node(element: &Element, kind: NodeKind) -> CodecResult<Node> {
    let mut node = Node::new(kind)
        .with_id(required_id(element)?)
        .with_title(element.child_text("title"))
        .with_description(element.child_text("description"));
    for attribute in element.children.iter().filter(|c| c.name == "attribute") {
        let key = attribute
            .attr("key")
            .ok_or_else(|| CodecError::schema("<attribute> without key"))?;
        node.attributes
            .insert(key.to_string(), attribute.text.clone());
    }
    Ok(node)
}

fn add_node(tree: &mut AttackTree, node: Node) -> CodecResult<NodeId> {
    let context = match &node.id {
        Some(id) => format!("node {id}"),
        None => format!("{} node", node.kind.label()),
    };
    tree.add_node(node)
        .map_err(|e| CodecError::rejected(context, e))
}

fn add_edge(tree: &mut AttackTree, source: &NodeId, destination: &NodeId) -> CodecResult<()> {
    tree.add_edge(source, destination)
        .map_err(|e| CodecError::rejected(format!("edge {source}-{destination}"), e))
}

// ----------------------------------------------------------------------------
// simple schema
// ----------------------------------------------------------------------------

fn decode_simple(tree: &mut AttackTree, body: &Element) -> CodecResult<()> {
    let [top] = body.children.as_slice() else {
        return Err(CodecError::schema("<tree> must hold exactly one node"));
    };
    if top.name != THREAT {
        return Err(CodecError::schema(format!(
            "top node must be a threat, found <{}>",
            top.name
        )));
    }
    reserve_explicit_ids(tree, top)?;
    let root = simple_element(tree, top)?;
    tree.set_root(&root)
        .map_err(|e| CodecError::rejected("root", e))
}

/// Reserves every explicit ID up front so allocated conjunction IDs
/// cannot clash with nodes that appear later in the document.
fn reserve_explicit_ids(tree: &mut AttackTree, element: &Element) -> CodecResult<()> {
    if let Some(raw) = element.attr("id") {
        tree.reserve(canonical_id(raw)?);
    }
    for child in &element.children {
        reserve_explicit_ids(tree, child)?;
    }
    Ok(())
}

/// Builds `element` and everything below it; returns its ID.
fn simple_element(tree: &mut AttackTree, element: &Element) -> CodecResult<NodeId> {
    match element.name.as_str() {
        THREAT | COUNTERMEASURE => {
            let kind = if element.name == THREAT {
                NodeKind::Threat
            } else {
                NodeKind::Countermeasure
            };
            check_children(
                element,
                &["title", "description", "attribute", "subtree", "countermeasures"],
            )?;
            let node = concrete_node(element, kind)?;
            let id = add_node(tree, node)?;
            for section in element
                .children
                .iter()
                .filter(|c| c.name == "subtree" || c.name == "countermeasures")
            {
                simple_children(tree, &id, section)?;
            }
            Ok(id)
        }
        name => {
            let conjunction = conjunction_type(name)
                .ok_or_else(|| CodecError::schema(format!("unknown element <{name}>")))?;
            let mut node = Node::conjunction(conjunction);
            if let Some(raw) = element.attr("id") {
                node = node.with_id(canonical_id(raw)?);
            }
            let id = add_node(tree, node)?;
            simple_children(tree, &id, element)?;
            Ok(id)
        }
    }
}

fn simple_children(tree: &mut AttackTree, parent: &NodeId, container: &Element) -> CodecResult<()> {
    for child in &container.children {
        let child_id = simple_element(tree, child)?;
        add_edge(tree, parent, &child_id)?;
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// extended schema
// ----------------------------------------------------------------------------

fn decode_extended(tree: &mut AttackTree, document: &Element, meta: &Element) -> CodecResult<()> {
    let root = meta
        .child("root")
        .map(|r| r.text.as_str())
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| CodecError::schema("extended document without <meta><root>"))?;
    let root = canonical_id(root)?;

    let sections = [
        ("threats", THREAT),
        ("countermeasures", COUNTERMEASURE),
        ("conjunctions", "conjunction"),
    ];
    let mut nodes = Vec::new();
    for (section, element_name) in sections {
        let Some(section) = document.child(section) else {
            continue;
        };
        for element in &section.children {
            if element.name != element_name {
                return Err(CodecError::schema(format!(
                    "unexpected <{}> in <{}>",
                    element.name, section.name
                )));
            }
            let node = match element_name {
                THREAT | COUNTERMEASURE => {
                    check_children(element, &["title", "description", "attribute"])?;
                    let kind = if element_name == THREAT {
                        NodeKind::Threat
                    } else {
                        NodeKind::Countermeasure
                    };
                    concrete_node(element, kind)?
                }
                _ => {
                    let raw = element.attr("type").unwrap_or_default();
                    let conjunction = conjunction_type(raw).ok_or_else(|| {
                        CodecError::schema(format!("unknown conjunction type '{raw}'"))
                    })?;
                    Node::conjunction(conjunction).with_id(required_id(element)?)
                }
            };
            if let Some(id) = &node.id {
                tree.reserve(id.clone());
            }
            nodes.push(node);
        }
    }
    for node in nodes {
        add_node(tree, node)?;
    }

    if let Some(connections) = document.child("connections") {
        for connection in &connections.children {
            extended_connection(tree, connection)?;
        }
    }

    tree.set_root(&root)
        .map_err(|e| CodecError::rejected("root", e))
}

fn extended_connection(tree: &mut AttackTree, connection: &Element) -> CodecResult<()> {
    if connection.name != "connection" {
        return Err(CodecError::schema(format!(
            "unexpected <{}> in <connections>",
            connection.name
        )));
    }
    let source = connection
        .attr("source")
        .ok_or_else(|| CodecError::schema("<connection> without source"))?;
    let source = canonical_id(source)?;
    let mut destinations = Vec::new();
    for destination in &connection.children {
        if destination.name != "destination" {
            return Err(CodecError::schema(format!(
                "unexpected <{}> in <connection>",
                destination.name
            )));
        }
        destinations.push(canonical_id(&destination.text)?);
    }

    // typed connections predate conjunction nodes: the type becomes a node
    let parent = match connection.attr("type") {
        Some(raw) => {
            let conjunction = conjunction_type(raw)
                .ok_or_else(|| CodecError::schema(format!("unknown conjunction type '{raw}'")))?;
            Some(add_node(tree, Node::conjunction(conjunction))?)
        }
        None => None,
    };
    let from = parent.as_ref().unwrap_or(&source);
    for destination in &destinations {
        add_edge(tree, from, destination)?;
    }
    if let Some(conjunction) = &parent {
        add_edge(tree, &source, conjunction)?;
    }
    Ok(())
}

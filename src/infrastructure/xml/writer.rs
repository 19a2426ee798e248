//! Tree to document

use itertools::Itertools;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::{debug, instrument};

use crate::domain::{AttackTree, KindClass, Node, NodeId, NodeKind};
use crate::infrastructure::xml::error::{CodecError, CodecResult};

struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn write(&mut self, event: Event<'_>) -> CodecResult<()> {
        self.inner
            .write_event(event)
            .map_err(|e| CodecError::Write(e.to_string()))
    }

    fn declaration(&mut self) -> CodecResult<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> CodecResult<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> CodecResult<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> CodecResult<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        if text.is_empty() {
            return self.write(Event::Empty(element));
        }
        self.write(Event::Start(element))?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> CodecResult<String> {
        let mut text =
            String::from_utf8(self.inner.into_inner()).map_err(|e| CodecError::Write(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

/// Whether `tree` can be written in the simple schema.
///
/// A tree loaded from an extended document stays extended.
fn fits_simple(tree: &mut AttackTree) -> bool {
    if tree.is_extended() || tree.check_extended() {
        return false;
    }
    tree.root()
        .and_then(|root| tree.node(root))
        .is_some_and(|node| node.kind == NodeKind::Threat)
}

#[instrument(level = "debug", skip_all)]
pub(crate) fn encode(tree: &mut AttackTree) -> CodecResult<String> {
    let simple = fits_simple(tree);
    debug!("encoding {} nodes as {}", tree.len(), if simple { "simple" } else { "extended" });

    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("attackTree", &[])?;
    write_meta(&mut w, tree)?;
    if simple {
        write_simple(&mut w, tree)?;
    } else {
        write_extended(&mut w, tree)?;
    }
    w.end("attackTree")?;
    w.finish()
}

fn write_meta(w: &mut XmlWriter, tree: &AttackTree) -> CodecResult<()> {
    let meta = &tree.meta;
    w.start("meta", &[])?;
    w.text_element("title", &[], &meta.title)?;
    w.text_element("author", &[], &meta.author)?;
    w.text_element("date", &[], &meta.date)?;
    w.text_element("description", &[], &meta.description)?;
    w.text_element("root", &[], tree.root().map(NodeId::as_str).unwrap_or_default())?;
    w.end("meta")
}

fn node_id(node: &Node) -> &str {
    node.id.as_ref().map(NodeId::as_str).unwrap_or_default()
}

fn write_content(w: &mut XmlWriter, node: &Node) -> CodecResult<()> {
    w.text_element("title", &[], &node.title)?;
    w.text_element("description", &[], &node.description)?;
    for (key, value) in &node.attributes {
        w.text_element("attribute", &[("key", key.as_str())], value)?;
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// simple schema
// ----------------------------------------------------------------------------

fn write_simple(w: &mut XmlWriter, tree: &AttackTree) -> CodecResult<()> {
    w.start("tree", &[])?;
    if let Some(root) = tree.root() {
        write_simple_node(w, tree, root)?;
    }
    w.end("tree")
}

fn write_simple_node(w: &mut XmlWriter, tree: &AttackTree, id: &NodeId) -> CodecResult<()> {
    let Some(node) = tree.node(id) else {
        return Ok(());
    };
    let name = node.kind.label();
    w.start(name, &[("id", node_id(node))])?;
    if node.is_conjunction() {
        for child in node.children() {
            write_simple_node(w, tree, child)?;
        }
    } else {
        write_content(w, node)?;
        let (countermeasures, subtree): (Vec<&NodeId>, Vec<&NodeId>) = node
            .children()
            .iter()
            .partition(|child| tree.type_down(child) == Some(KindClass::Countermeasure));
        for (section, children) in [("subtree", subtree), ("countermeasures", countermeasures)] {
            if children.is_empty() {
                continue;
            }
            w.start(section, &[])?;
            for child in children {
                write_simple_node(w, tree, child)?;
            }
            w.end(section)?;
        }
    }
    w.end(name)
}

// ----------------------------------------------------------------------------
// extended schema
// ----------------------------------------------------------------------------

fn write_extended(w: &mut XmlWriter, tree: &AttackTree) -> CodecResult<()> {
    for (section, class) in [
        ("threats", KindClass::Threat),
        ("countermeasures", KindClass::Countermeasure),
    ] {
        w.start(section, &[])?;
        for (_, node) in tree.nodes().filter(|(_, n)| n.kind.class() == class) {
            let name = node.kind.label();
            w.start(name, &[("id", node_id(node))])?;
            write_content(w, node)?;
            w.end(name)?;
        }
        w.end(section)?;
    }

    w.start("conjunctions", &[])?;
    for (_, node) in tree.nodes() {
        if let NodeKind::Conjunction(conjunction) = node.kind {
            w.text_element(
                "conjunction",
                &[("id", node_id(node)), ("type", conjunction.as_str())],
                "",
            )?;
        }
    }
    w.end("conjunctions")?;

    // one element per run of edges sharing a source keeps the edge order
    w.start("connections", &[])?;
    for (source, run) in &tree.edges().iter().chunk_by(|edge| edge.source.clone()) {
        w.start("connection", &[("source", source.as_str())])?;
        for edge in run {
            w.text_element("destination", &[], edge.destination.as_str())?;
        }
        w.end("connection")?;
    }
    w.end("connections")
}

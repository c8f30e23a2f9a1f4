//! Push-down descriptor parser.
//!
//! Every element opens a grammar state and pushes the node it builds; every
//! closing tag pops that node and attaches it to the node below it. The
//! cursor state is always the grammar of the node on top of the stack.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::model::{
    Application, Attribute, Configuration, Entitlement, Environment, Predecessor, Template,
};
use crate::TemplateError;

/// Grammar states of the descriptor.
///
/// ```text
/// Init
/// └── configuration
///     └── environment
///         └── template
///             ├── predecessor ─┐
///             ├── application ─┼── attribute
///             └── entitlement ─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Init,
    Configuration,
    Environment,
    Template,
    Predecessor,
    Application,
    Entitlement,
    Attribute,
}

impl Grammar {
    const ELEMENTS: [Grammar; 7] = [
        Grammar::Configuration,
        Grammar::Environment,
        Grammar::Template,
        Grammar::Predecessor,
        Grammar::Application,
        Grammar::Entitlement,
        Grammar::Attribute,
    ];

    /// Returns the element name of this state.
    pub const fn tag(&self) -> &'static str {
        match self {
            Grammar::Init => "#document",
            Grammar::Configuration => "configuration",
            Grammar::Environment => "environment",
            Grammar::Template => "template",
            Grammar::Predecessor => "predecessor",
            Grammar::Application => "application",
            Grammar::Entitlement => "entitlement",
            Grammar::Attribute => "attribute",
        }
    }

    /// States this state may be entered from.
    pub const fn parents(&self) -> &'static [Grammar] {
        match self {
            Grammar::Init => &[],
            Grammar::Configuration => &[Grammar::Init],
            Grammar::Environment => &[Grammar::Configuration],
            Grammar::Template => &[Grammar::Environment],
            Grammar::Predecessor | Grammar::Application | Grammar::Entitlement => {
                &[Grammar::Template]
            }
            Grammar::Attribute => &[
                Grammar::Predecessor,
                Grammar::Application,
                Grammar::Entitlement,
            ],
        }
    }

    /// Resolves an element name to its state.
    pub fn lookup(tag: &str) -> Option<Grammar> {
        Self::ELEMENTS.into_iter().find(|g| g.tag() == tag)
    }

    /// Returns true if `next` may be opened while `self` is the cursor.
    pub fn transition(&self, next: Grammar) -> bool {
        next.parents().contains(self)
    }
}

/// Partially built node on the parser stack.
#[derive(Debug)]
enum Node {
    Configuration(Configuration),
    Environment(Environment),
    Template(Template),
    Predecessor(Predecessor),
    Application(Application),
    Entitlement(Entitlement),
    Attribute(Attribute),
}

impl Node {
    fn grammar(&self) -> Grammar {
        match self {
            Node::Configuration(_) => Grammar::Configuration,
            Node::Environment(_) => Grammar::Environment,
            Node::Template(_) => Grammar::Template,
            Node::Predecessor(_) => Grammar::Predecessor,
            Node::Application(_) => Grammar::Application,
            Node::Entitlement(_) => Grammar::Entitlement,
            Node::Attribute(_) => Grammar::Attribute,
        }
    }
}

/// Parses a descriptor from a string.
pub fn parse_str(input: &str) -> Result<Configuration, TemplateError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut parser = Parser::new(input);
    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event();
        // markup events start at the first '<' past the skipped whitespace
        let offset = input
            .get(before..)
            .and_then(|rest| rest.find('<'))
            .map_or(before, |skip| before + skip);
        match event {
            Ok(Event::Start(e)) => parser.start(&e, offset)?,
            Ok(Event::Empty(e)) => {
                parser.start(&e, offset)?;
                parser.end(offset)?;
            }
            Ok(Event::End(_)) => parser.end(offset)?,
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| parser.syntax(before, err.to_string()))?;
                parser.text(&text);
            }
            Ok(Event::CData(e)) => parser.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                let offset = reader.error_position() as usize;
                return Err(parser.syntax(offset, e.to_string()));
            }
        }
    }

    parser.finish()
}

/// Reads and parses a descriptor file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Configuration, TemplateError> {
    let input = std::fs::read_to_string(path)?;
    parse_str(&input)
}

struct Parser<'a> {
    input: &'a str,
    stack: Vec<Node>,
    root: Option<Configuration>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            stack: Vec::new(),
            root: None,
        }
    }

    fn cursor(&self) -> Grammar {
        self.stack.last().map_or(Grammar::Init, Node::grammar)
    }

    fn locate(&self, offset: usize) -> (usize, usize) {
        let consumed = &self.input.as_bytes()[..offset.min(self.input.len())];
        let line = consumed.iter().filter(|b| **b == b'\n').count() + 1;
        let column = consumed.iter().rev().take_while(|b| **b != b'\n').count() + 1;
        (line, column)
    }

    fn syntax(&self, offset: usize, message: String) -> TemplateError {
        let (line, column) = self.locate(offset);
        TemplateError::Syntax {
            line,
            column,
            message,
        }
    }

    fn start(&mut self, element: &BytesStart<'_>, offset: usize) -> Result<(), TemplateError> {
        let (line, column) = self.locate(offset);
        let name = element.local_name();
        let tag = String::from_utf8_lossy(name.as_ref());

        let Some(state) = Grammar::lookup(&tag) else {
            return Err(TemplateError::UnknownElement {
                line,
                column,
                tag: tag.into_owned(),
            });
        };

        let cursor = self.cursor();
        // a second root element re-enters from Init after the first closed
        if self.root.is_some() || !cursor.transition(state) {
            return Err(TemplateError::Transition {
                line,
                column,
                from: cursor.tag(),
                to: state.tag(),
            });
        }

        let node = match state {
            Grammar::Configuration => Node::Configuration(Configuration::default()),
            Grammar::Environment => Node::Environment(Environment {
                id: self.required(element, state, "id", offset)?,
                label: self.optional(element, "label", offset)?,
                templates: Vec::new(),
            }),
            Grammar::Template => Node::Template(Template {
                id: self.required(element, state, "id", offset)?,
                label: self.optional(element, "label", offset)?,
                ..Default::default()
            }),
            Grammar::Predecessor => {
                if let Some(Node::Template(t)) = self.stack.last() {
                    if t.predecessor.is_some() {
                        return Err(TemplateError::DuplicatePredecessor { line, column });
                    }
                }
                Node::Predecessor(Predecessor {
                    id: self.required(element, state, "id", offset)?,
                    label: self.optional(element, "label", offset)?,
                    attributes: Vec::new(),
                })
            }
            Grammar::Application => Node::Application(Application {
                id: self.required(element, state, "id", offset)?,
                label: self.optional(element, "label", offset)?,
                attributes: Vec::new(),
            }),
            Grammar::Entitlement => Node::Entitlement(Entitlement {
                id: self.required(element, state, "id", offset)?,
                label: self.optional(element, "label", offset)?,
                attributes: Vec::new(),
            }),
            Grammar::Attribute => Node::Attribute(Attribute {
                id: self.required(element, state, "id", offset)?,
                mapping: self.optional(element, "mapping", offset)?,
                value: String::new(),
            }),
            Grammar::Init => {
                return Err(TemplateError::Transition {
                    line,
                    column,
                    from: cursor.tag(),
                    to: state.tag(),
                })
            }
        };

        self.stack.push(node);
        Ok(())
    }

    fn end(&mut self, offset: usize) -> Result<(), TemplateError> {
        let (line, column) = self.locate(offset);
        let Some(node) = self.stack.pop() else {
            return Err(TemplateError::Syntax {
                line,
                column,
                message: "closing tag without matching element".to_string(),
            });
        };

        match (node, self.stack.last_mut()) {
            (Node::Configuration(c), None) => self.root = Some(c),
            (Node::Environment(e), Some(Node::Configuration(p))) => p.environments.push(e),
            (Node::Template(t), Some(Node::Environment(p))) => p.templates.push(t),
            (Node::Predecessor(x), Some(Node::Template(p))) => p.predecessor = Some(x),
            (Node::Application(x), Some(Node::Template(p))) => p.applications.push(x),
            (Node::Entitlement(x), Some(Node::Template(p))) => p.entitlements.push(x),
            (Node::Attribute(a), Some(Node::Predecessor(p))) => p.attributes.push(a),
            (Node::Attribute(a), Some(Node::Application(p))) => p.attributes.push(a),
            (Node::Attribute(a), Some(Node::Entitlement(p))) => p.attributes.push(a),
            (node, parent) => {
                return Err(TemplateError::Transition {
                    line,
                    column,
                    from: parent.map_or(Grammar::Init, |p| p.grammar()).tag(),
                    to: node.grammar().tag(),
                })
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(Node::Attribute(a)) = self.stack.last_mut() {
            a.value.push_str(text);
        }
    }

    fn finish(self) -> Result<Configuration, TemplateError> {
        if let Some(open) = self.stack.last() {
            return Err(self.syntax(
                self.input.len(),
                format!("unexpected end of document inside <{}>", open.grammar().tag()),
            ));
        }
        self.root.ok_or(TemplateError::Empty)
    }

    fn optional(
        &self,
        element: &BytesStart<'_>,
        key: &str,
        offset: usize,
    ) -> Result<Option<String>, TemplateError> {
        for attr in element.attributes() {
            let attr = attr.map_err(|e| self.syntax(offset, e.to_string()))?;
            if attr.key.local_name().as_ref() == key.as_bytes() {
                let value = attr
                    .unescape_value()
                    .map_err(|e| self.syntax(offset, e.to_string()))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    fn required(
        &self,
        element: &BytesStart<'_>,
        state: Grammar,
        key: &'static str,
        offset: usize,
    ) -> Result<String, TemplateError> {
        match self.optional(element, key, offset)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => {
                let (line, column) = self.locate(offset);
                Err(TemplateError::MissingAttribute {
                    line,
                    column,
                    element: state.tag(),
                    attribute: key,
                })
            }
        }
    }
}

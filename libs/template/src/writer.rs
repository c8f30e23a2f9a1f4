//! Descriptor marshalling.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::model::{Attribute, Configuration};
use crate::TemplateError;

/// Writes a configuration back to its XML form, prolog included.
pub fn marshal(configuration: &Configuration) -> Result<String, TemplateError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;

    open(&mut writer, "configuration", &[])?;
    for environment in &configuration.environments {
        open(
            &mut writer,
            "environment",
            &labelled(&environment.id, environment.label.as_deref()),
        )?;
        for template in &environment.templates {
            open(
                &mut writer,
                "template",
                &labelled(&template.id, template.label.as_deref()),
            )?;
            if let Some(p) = &template.predecessor {
                holder(&mut writer, "predecessor", &p.id, p.label.as_deref(), &p.attributes)?;
            }
            for a in &template.applications {
                holder(&mut writer, "application", &a.id, a.label.as_deref(), &a.attributes)?;
            }
            for e in &template.entitlements {
                holder(&mut writer, "entitlement", &e.id, e.label.as_deref(), &e.attributes)?;
            }
            close(&mut writer, "template")?;
        }
        close(&mut writer, "environment")?;
    }
    close(&mut writer, "configuration")?;

    String::from_utf8(writer.into_inner()).map_err(|e| TemplateError::Write(e.to_string()))
}

fn labelled<'a>(id: &'a str, label: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
    let mut attributes = vec![("id", id)];
    if let Some(label) = label {
        attributes.push(("label", label));
    }
    attributes
}

fn holder(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    id: &str,
    label: Option<&str>,
    attributes: &[Attribute],
) -> Result<(), TemplateError> {
    open(writer, tag, &labelled(id, label))?;
    for attribute in attributes {
        let mut element = BytesStart::new("attribute");
        element.push_attribute(("id", attribute.id.as_str()));
        if let Some(mapping) = &attribute.mapping {
            element.push_attribute(("mapping", mapping.as_str()));
        }

        if attribute.value.is_empty() {
            emit(writer, Event::Empty(element))?;
        } else {
            emit(writer, Event::Start(element))?;
            emit(writer, Event::Text(BytesText::new(&attribute.value)))?;
            close(writer, "attribute")?;
        }
    }
    close(writer, tag)
}

fn open(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    attributes: &[(&str, &str)],
) -> Result<(), TemplateError> {
    let mut element = BytesStart::new(tag);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    emit(writer, Event::Start(element))
}

fn close(writer: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), TemplateError> {
    emit(writer, Event::End(BytesEnd::new(tag)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), TemplateError> {
    writer
        .write_event(event)
        .map_err(|e| TemplateError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Application, Environment, Predecessor, Template};
    use crate::parse_str;

    fn sample() -> Configuration {
        Configuration {
            environments: vec![Environment {
                id: "prod".to_string(),
                label: Some("Production & Co".to_string()),
                templates: vec![Template {
                    id: "admin".to_string(),
                    label: None,
                    predecessor: Some(Predecessor {
                        id: "AD".to_string(),
                        label: None,
                        attributes: vec![Attribute {
                            id: "login".to_string(),
                            mapping: Some("UD_AD_LOGIN".to_string()),
                            value: "a < b".to_string(),
                        }],
                    }),
                    applications: vec![Application {
                        id: "DB".to_string(),
                        label: Some("Database".to_string()),
                        attributes: vec![Attribute {
                            id: "flag".to_string(),
                            mapping: None,
                            value: String::new(),
                        }],
                    }],
                    entitlements: Vec::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_marshal_then_parse_yields_same_tree() {
        let config = sample();
        let xml = marshal(&config).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\""));
        assert_eq!(parse_str(&xml).unwrap(), config);
    }

    #[test]
    fn test_marshal_escapes_values() {
        let xml = marshal(&sample()).unwrap();
        assert!(xml.contains("a &lt; b"));
        assert!(xml.contains("Production &amp; Co"));
    }
}

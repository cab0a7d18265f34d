//! Loads a context: a root document plus every document it includes.
//!
//! Loading happens in two passes. The include pass visits documents
//! depth-first, registering each document's `<variable>` and
//! `<environment>` declarations before following its `<include>`s, so a
//! document sees the variables of every document visited before it. The bean
//! pass then parses the `<bean>` declarations of every visited document, in
//! visit order, into [`BeanDefinition`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::array::ArrayBuilder;
use crate::definition::{setter_name, BeanDefinition, ImplementationKind, Scope};
use crate::document::Element;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::value::Value;
use crate::variables::VariableTable;
use crate::{Error, Result};

/// Bean definitions of one context, keyed by bean name.
pub type Definitions = HashMap<String, BeanDefinition>;

/// A parsed document and where it was read from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub root: Element,
}

/// Loads documents into bean definitions, registering their variables into
/// the shared table.
pub struct ContextLoader<'a> {
    variables: &'a mut VariableTable,
    environment: &'a dyn Environment,
    evaluator: &'a dyn Evaluator,
}

impl<'a> ContextLoader<'a> {
    pub fn new(
        variables: &'a mut VariableTable,
        environment: &'a dyn Environment,
        evaluator: &'a dyn Evaluator,
    ) -> Self {
        Self {
            variables,
            environment,
            evaluator,
        }
    }

    /// Loads the context rooted at `path`.
    pub fn load(&mut self, path: &Path) -> Result<Definitions> {
        let mut documents = Vec::new();
        self.collect_documents(path, &mut documents)?;
        self.parse_beans(&documents)
    }

    /// Visits `path` and, recursively, its includes, appending each document
    /// to `documents` in pre-order.
    pub fn collect_documents(
        &mut self,
        path: &Path,
        documents: &mut Vec<LoadedDocument>,
    ) -> Result<()> {
        let path = normalize(path);
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }
        let path = path
            .canonicalize()
            .map_err(|source| Error::Read {
                path: path.clone(),
                source,
            })?;
        if documents.iter().any(|document| document.path == path) {
            return Err(Error::AlreadyLoaded(path));
        }

        let root = read_document(&path)?;
        debug!(path = %path.display(), "visiting document");
        self.load_variables(&root)?;

        let includes: Vec<Element> = root.children_named("include").cloned().collect();
        documents.push(LoadedDocument {
            path: path.clone(),
            root,
        });

        // each filename sees the variables of the includes visited before it
        for include in &includes {
            let target = self.include_path(&path, include)?;
            self.collect_documents(&target, documents)?;
        }
        Ok(())
    }

    /// Registers `<variable>` declarations, then `<environment>` references.
    pub fn load_variables(&mut self, root: &Element) -> Result<()> {
        for declaration in root.children_named("variable") {
            let name = declaration.attr("name");
            if name.is_empty() || self.variables.contains(name) {
                continue;
            }
            let value = match ImplementationKind::classify(declaration.attr("impl")) {
                ImplementationKind::Array => {
                    let builder = ArrayBuilder::new(&*self.variables, self.evaluator);
                    Value::Array(builder.build(declaration)?)
                }
                _ => Value::Str(declaration.attr("value").to_string()),
            };
            self.variables.register(name, value);
        }

        for declaration in root.children_named("environment") {
            let name = declaration.text().trim();
            self.variables.declare_environment(name, self.environment)?;
        }
        Ok(())
    }

    fn include_path(&self, current: &Path, include: &Element) -> Result<PathBuf> {
        let filename = match self.variables.substitute(include.attr("filename"))? {
            Value::Str(filename) => filename,
            other => {
                return Err(Error::InvalidInclude {
                    path: current.to_path_buf(),
                    value: other.to_string(),
                })
            }
        };

        let target = normalize(Path::new(&filename));
        let target = if target.is_absolute() {
            target
        } else {
            current
                .parent()
                .map_or_else(|| target.clone(), |dir| dir.join(&target))
        };

        target
            .canonicalize()
            .map_err(|_| Error::IncludeNotFound(target))
    }

    /// Parses every `<bean>` of every document into a definition.
    pub fn parse_beans(&self, documents: &[LoadedDocument]) -> Result<Definitions> {
        let mut definitions = Definitions::new();
        for document in documents {
            for bean in document.root.children_named("bean") {
                let definition = self.parse_bean(bean)?;
                if definitions.contains_key(definition.name()) {
                    return Err(Error::DuplicateBean {
                        bean: definition.name().to_string(),
                    });
                }
                debug!(
                    bean = definition.name(),
                    implementation = definition.implementation(),
                    path = %document.path.display(),
                    "parsed bean definition"
                );
                definitions.insert(definition.name().to_string(), definition);
            }
        }
        Ok(definitions)
    }

    /// Parses one `<bean>` declaration.
    pub fn parse_bean(&self, bean: &Element) -> Result<BeanDefinition> {
        let name = bean.attr("name");
        let value = self.variables.substitute(bean.attr("value"))?;
        let mut definition = BeanDefinition::new(name, bean.attr("impl")).with_value(value);

        if !definition.has_implementation() {
            return Err(Error::MissingImplementation {
                bean: name.to_string(),
            });
        }

        let scope_text = bean.attr("type");
        let scope = Scope::parse(scope_text).ok_or_else(|| Error::UnhandledScope {
            bean: name.to_string(),
            scope: scope_text.to_string(),
        })?;
        definition = definition.with_scope(scope);

        let builder = ArrayBuilder::new(&*self.variables, self.evaluator);
        for property in bean.children_named("property") {
            let property_name = property.attr("name");
            if property_name.is_empty() {
                return Err(Error::InvalidProperty {
                    bean: name.to_string(),
                });
            }
            let value = self.property_value(&builder, property)?;
            definition = definition.with_property(setter_name(property_name), value);
        }

        let values = builder.build(bean)?;
        Ok(definition.with_values(values))
    }

    /// Reads a property's `value` attribute, or the array declared by its
    /// nested `<bean impl="array">`. A property with neither is `Null`.
    fn property_value(&self, builder: &ArrayBuilder<'_>, property: &Element) -> Result<Value> {
        let raw = property.attr("value");
        if !raw.is_empty() {
            return self.variables.substitute(raw);
        }

        let Some(nested) = property.child("bean") else {
            return Ok(Value::Null);
        };
        let implementation = nested.attr("impl");
        if ImplementationKind::classify(implementation) != ImplementationKind::Array {
            return Err(Error::InvalidArray(format!(
                "property '{}' must declare an array, not '{implementation}'",
                property.attr("name")
            )));
        }
        let array = builder.build(nested)?;
        if array.is_empty() {
            return Err(Error::InvalidArray(format!(
                "property '{}' declares an empty array",
                property.attr("name")
            )));
        }
        self.variables.substitute_value(Value::Array(array))
    }
}

fn read_document(path: &Path) -> Result<Element> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Element::parse(&source).map_err(|source| Error::InvalidDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Converts `\` separators to `/`.
fn normalize(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) if text.contains('\\') => PathBuf::from(text.replace('\\', "/")),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ExpressionEvaluator;
    use crate::value::ArrayValue;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn load_with(path: &Path, env: &HashMap<String, String>) -> Result<(Definitions, VariableTable)> {
        let mut variables = VariableTable::new();
        let evaluator = ExpressionEvaluator::new();
        let definitions = ContextLoader::new(&mut variables, env, &evaluator).load(path)?;
        Ok((definitions, variables))
    }

    fn load(path: &Path) -> Result<Definitions> {
        load_with(path, &HashMap::new()).map(|(definitions, _)| definitions)
    }

    #[test]
    fn test_load_single_document() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "beans.xml",
            r#"<beans>
                <variable name="name" value="world"/>
                <bean name="greeting" impl="String" value="hello $name"/>
                <bean name="mailer" impl="app.Mailer" type="singleton">
                    <property name="host" value="smtp.$name"/>
                    <property name="retries" value="3"/>
                </bean>
            </beans>"#,
        );

        let definitions = load(&root).unwrap();

        let greeting = &definitions["greeting"];
        assert_eq!(greeting.kind(), ImplementationKind::String);
        assert_eq!(greeting.value(), &Value::from("hello world"));

        let mailer = &definitions["mailer"];
        assert!(mailer.is_singleton());
        assert_eq!(
            mailer.properties(),
            &[
                ("setHost".to_string(), Value::from("smtp.world")),
                ("setRetries".to_string(), Value::from("3")),
            ]
        );
    }

    #[test]
    fn test_relative_and_nested_includes() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "conf/shared/db.xml",
            r#"<beans><bean name="db" impl="string" value="$host"/></beans>"#,
        );
        write(
            &dir,
            "conf/services.xml",
            r#"<beans>
                <include filename="shared/db.xml"/>
                <bean name="svc" impl="string" value="svc"/>
            </beans>"#,
        );
        let root = write(
            &dir,
            "main.xml",
            r#"<beans>
                <variable name="host" value="db.local"/>
                <include filename="conf/services.xml"/>
            </beans>"#,
        );

        let definitions = load(&root).unwrap();

        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions["db"].value(), &Value::from("db.local"));
    }

    #[test]
    fn test_absolute_include_through_variable() {
        let dir = TempDir::new().unwrap();
        let other = write(&dir, "abs/other.xml", r#"<beans><bean name="o" impl="string" value="x"/></beans>"#);
        let root = write(
            &dir,
            "main.xml",
            &format!(
                r#"<beans>
                    <variable name="other" value="{}"/>
                    <include filename="$other"/>
                </beans>"#,
                other.display()
            ),
        );

        let definitions = load(&root).unwrap();
        assert!(definitions.contains_key("o"));
    }

    #[test]
    fn test_include_filename_uses_variable_from_earlier_include() {
        let dir = TempDir::new().unwrap();
        write(&dir, "vars.xml", r#"<beans><variable name="dir" value="sub"/></beans>"#);
        write(&dir, "sub/other.xml", r#"<beans><bean name="other" impl="string" value="o"/></beans>"#);
        let root = write(
            &dir,
            "main.xml",
            r#"<beans>
                <include filename="vars.xml"/>
                <include filename="$dir/other.xml"/>
            </beans>"#,
        );

        let definitions = load(&root).unwrap();
        assert_eq!(definitions["other"].value(), &Value::from("o"));
    }

    #[test]
    fn test_include_filename_must_be_text() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "main.xml",
            r#"<beans>
                <variable name="files" impl="array">
                    <value>a.xml</value>
                    <value>b.xml</value>
                </variable>
                <include filename="$files"/>
            </beans>"#,
        );

        assert!(matches!(
            load(&root),
            Err(Error::InvalidInclude { value, .. }) if value.contains("a.xml")
        ));
    }

    #[test]
    fn test_include_cycle_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.xml", r#"<beans><include filename="a.xml"/></beans>"#);
        let root = write(&dir, "a.xml", r#"<beans><include filename="b.xml"/></beans>"#);

        assert!(matches!(load(&root), Err(Error::AlreadyLoaded(_))));
    }

    #[test]
    fn test_missing_include() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.xml", r#"<beans><include filename="nope.xml"/></beans>"#);

        assert!(matches!(load(&root), Err(Error::IncludeNotFound(_))));
    }

    #[test]
    fn test_missing_root_document() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir.path().join("missing.xml"));

        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_document() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.xml", "<beans><bean></beans>");

        assert!(matches!(load(&root), Err(Error::InvalidDocument { .. })));
    }

    #[test]
    fn test_duplicate_bean_across_includes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.xml", r#"<beans><bean name="dup" impl="string" value="b"/></beans>"#);
        let root = write(
            &dir,
            "a.xml",
            r#"<beans>
                <include filename="b.xml"/>
                <bean name="dup" impl="string" value="a"/>
            </beans>"#,
        );

        assert!(matches!(
            load(&root),
            Err(Error::DuplicateBean { bean }) if bean == "dup"
        ));
    }

    #[test]
    fn test_missing_implementation() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.xml", r#"<beans><bean name="x" value="v"/></beans>"#);

        assert!(matches!(
            load(&root),
            Err(Error::MissingImplementation { bean }) if bean == "x"
        ));
    }

    #[test]
    fn test_unhandled_scope() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xml",
            r#"<beans><bean name="x" impl="string" type="prototype" value="v"/></beans>"#,
        );

        assert!(matches!(
            load(&root),
            Err(Error::UnhandledScope { scope, .. }) if scope == "prototype"
        ));
    }

    #[test]
    fn test_environment_declarations() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xml",
            r#"<beans>
                <variable name="keys" value="/home/$USER/.ssh"/>
                <environment>USER</environment>
                <bean name="keys" impl="string" value="$keys"/>
            </beans>"#,
        );
        let env: HashMap<String, String> = [("USER".to_string(), "bob".to_string())].into();

        let (definitions, variables) = load_with(&root, &env).unwrap();

        assert_eq!(variables.get("keys"), Some(&Value::from("/home/bob/.ssh")));
        assert_eq!(definitions["keys"].value(), &Value::from("/home/bob/.ssh"));
    }

    #[test]
    fn test_undefined_environment() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.xml", r#"<beans><environment>NOT_SET_ANYWHERE</environment></beans>"#);

        assert!(matches!(
            load(&root),
            Err(Error::UndefinedEnvironment(name)) if name == "NOT_SET_ANYWHERE"
        ));
    }

    #[test]
    fn test_array_variable() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xml",
            r#"<beans>
                <variable name="servers" impl="array">
                    <value>alpha</value>
                    <value>beta</value>
                </variable>
                <bean name="cluster" impl="app.Cluster">
                    <property name="servers" value="$servers"/>
                </bean>
            </beans>"#,
        );

        let definitions = load(&root).unwrap();
        let expected = Value::Array(ArrayValue::from_values(["alpha".into(), "beta".into()]));
        assert_eq!(definitions["cluster"].properties()[0].1, expected);
    }

    #[test]
    fn test_property_with_nested_array() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xml",
            r#"<beans>
                <variable name="region" value="eu"/>
                <bean name="svc" impl="app.Service">
                    <property name="zones">
                        <bean impl="array">
                            <value key="primary">$region-1</value>
                            <value key="backup">us-1</value>
                        </bean>
                    </property>
                    <property name="unset"/>
                </bean>
            </beans>"#,
        );

        let definitions = load(&root).unwrap();
        let properties = definitions["svc"].properties();
        let zones = properties[0].1.as_array().unwrap();
        assert_eq!(properties[0].0, "setZones");
        assert_eq!(zones.get_key("primary"), Some(&Value::from("eu-1")));
        assert_eq!(properties[1], ("setUnset".to_string(), Value::Null));
    }

    #[test]
    fn test_property_with_empty_nested_array() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xml",
            r#"<beans>
                <bean name="svc" impl="app.Service">
                    <property name="zones"><bean impl="array"/></property>
                </bean>
            </beans>"#,
        );

        assert!(matches!(load(&root), Err(Error::InvalidArray(_))));
    }

    #[test]
    fn test_values_are_built_for_every_bean() {
        let dir = TempDir::new().unwrap();
        let root = write(
            &dir,
            "a.xml",
            r#"<beans>
                <bean name="svc" impl="app.Service">
                    <value key="tag">a</value>
                    <value key="tag">b</value>
                </bean>
            </beans>"#,
        );

        let definitions = load(&root).unwrap();
        let expected = Value::Array(ArrayValue::from_values(["a".into(), "b".into()]));
        assert_eq!(definitions["svc"].values().get_key("tag"), Some(&expected));
    }

    #[test]
    fn test_backslash_separators_are_normalized() {
        let dir = TempDir::new().unwrap();
        write(&dir, "sub/b.xml", r#"<beans><bean name="b" impl="string" value="b"/></beans>"#);
        let root = write(&dir, "a.xml", r#"<beans><include filename="sub\b.xml"/></beans>"#);

        let definitions = load(&root).unwrap();
        assert!(definitions.contains_key("b"));
    }
}

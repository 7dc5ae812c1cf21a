//! Include fragments, expanded in dependency order

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use super::{expand, Scope, Template, TemplateError};
use crate::helpers::Helpers;

struct Include {
    source: String,
    references: BTreeSet<String>,
}

/// Expansion order of includes: dependencies come before their dependents.
///
/// Each group is either a single include or the members of one reference
/// cycle, which cannot be ordered and fall back to bounded expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeOrder {
    pub groups: Vec<IncludeGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeGroup {
    pub names: Vec<String>,
    pub cyclic: bool,
}

impl IncludeOrder {
    /// Include names in expansion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.names.iter().map(String::as_str))
    }

    pub fn cycles(&self) -> impl Iterator<Item = &[String]> {
        self.groups
            .iter()
            .filter(|g| g.cyclic)
            .map(|g| g.names.as_slice())
    }
}

/// The registered include fragments of a site
#[derive(Default)]
pub struct IncludeSet {
    includes: BTreeMap<String, Include>,
    order: IncludeOrder,
}

impl IncludeSet {
    /// Load every `*.html` file in a directory; the name is the file stem.
    /// A missing directory yields an empty set.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let pattern = format!(
            "{}/*.html",
            glob::Pattern::escape(&dir.to_string_lossy())
        );

        let mut sources = Vec::new();
        for path in glob::glob(&pattern)
            .with_context(|| format!("Invalid include pattern {}", pattern))?
        {
            let path = path?;
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read include {:?}", path))?;
            sources.push((name.to_string(), source));
        }

        tracing::debug!("Loaded {} includes from {:?}", sources.len(), dir);
        Ok(Self::from_sources(sources)?)
    }

    /// Build from `(name, source)` pairs
    pub fn from_sources<I>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut includes = BTreeMap::new();
        for (name, source) in sources {
            let references = Template::parse(&source)?.include_references();
            includes.insert(name, Include { source, references });
        }
        let order = dependency_order(&includes);
        Ok(Self { includes, order })
    }

    pub fn order(&self) -> &IncludeOrder {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.includes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Expand every include against `data`, inserting each result into
    /// `data["includes"]` as soon as it is available so later includes see it.
    ///
    /// Reference cycles are expanded with the pass ceiling, or rejected when
    /// `strict` is set.
    pub fn render_into(
        &self,
        data: &mut Value,
        helpers: &Helpers,
        strict: bool,
    ) -> Result<IndexMap<String, String>, TemplateError> {
        let mut rendered = IndexMap::new();
        set_includes(data, Map::new());

        for group in &self.order.groups {
            if group.cyclic {
                let mut cycle = group.names.clone();
                cycle.push(group.names[0].clone());
                if strict {
                    return Err(TemplateError::IncludeCycle(cycle));
                }
                tracing::debug!(
                    "Include cycle {}; expanding with at most {} passes",
                    cycle.join(" -> "),
                    super::MAX_PASSES
                );
            }

            for name in &group.names {
                let include = &self.includes[name];
                let expansion = expand(&include.source, Scope::new(data, helpers))?;
                if !expansion.converged {
                    if strict {
                        return Err(TemplateError::NotConverged {
                            passes: expansion.passes,
                        });
                    }
                    tracing::warn!("Include {} did not stabilize", name);
                }
                if let Some(Value::Object(map)) = data.get_mut("includes") {
                    map.insert(name.clone(), Value::String(expansion.output.clone()));
                }
                rendered.insert(name.clone(), expansion.output);
            }
        }

        Ok(rendered)
    }
}

fn set_includes(data: &mut Value, includes: Map<String, Value>) {
    if let Value::Object(map) = data {
        map.insert("includes".to_string(), Value::Object(includes));
    }
}

/// Strongly connected components of the reference graph, dependencies first
fn dependency_order(includes: &BTreeMap<String, Include>) -> IncludeOrder {
    struct Tarjan<'a> {
        includes: &'a BTreeMap<String, Include>,
        index: HashMap<&'a str, usize>,
        lowlink: HashMap<&'a str, usize>,
        on_stack: BTreeSet<&'a str>,
        stack: Vec<&'a str>,
        next_index: usize,
        groups: Vec<IncludeGroup>,
    }

    impl<'a> Tarjan<'a> {
        fn visit(&mut self, name: &'a str) {
            self.index.insert(name, self.next_index);
            self.lowlink.insert(name, self.next_index);
            self.next_index += 1;
            self.stack.push(name);
            self.on_stack.insert(name);

            let includes = self.includes;
            for dep in &includes[name].references {
                let Some((dep, _)) = includes.get_key_value(dep.as_str()) else {
                    continue;
                };
                let dep = dep.as_str();
                if !self.index.contains_key(dep) {
                    self.visit(dep);
                    let low = self.lowlink[name].min(self.lowlink[dep]);
                    self.lowlink.insert(name, low);
                } else if self.on_stack.contains(dep) {
                    let low = self.lowlink[name].min(self.index[dep]);
                    self.lowlink.insert(name, low);
                }
            }

            if self.lowlink[name] == self.index[name] {
                let mut names = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(member);
                    names.push(member.to_string());
                    if member == name {
                        break;
                    }
                }
                names.sort();
                let cyclic = names.len() > 1 || includes[name].references.contains(name);
                self.groups.push(IncludeGroup { names, cyclic });
            }
        }
    }

    let mut tarjan = Tarjan {
        includes,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        on_stack: BTreeSet::new(),
        stack: Vec::new(),
        next_index: 0,
        groups: Vec::new(),
    };
    for name in includes.keys() {
        if !tarjan.index.contains_key(name.as_str()) {
            tarjan.visit(name);
        }
    }

    IncludeOrder {
        groups: tarjan.groups,
    }
}

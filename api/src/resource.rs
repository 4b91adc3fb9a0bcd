//! Declarative resource descriptors.
//!
//! A [`ResourceDescriptor`] names a collection, its base path and the subset
//! of the five standard actions it exposes. Every enabled action yields a
//! [`Route`]: a fixed HTTP method paired with a compiled [`PathTemplate`]
//! that can both match incoming paths and build outgoing ones.

use std::{collections::BTreeMap, fmt};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("missing required path parameter `{0}`")]
    MissingParameter(String),
    #[error("action `{action}` is not enabled for resource `{resource}`")]
    ActionDisabled { resource: String, action: Action },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Index,
    Show,
    Create,
    Update,
    Destroy,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Index,
        Action::Show,
        Action::Create,
        Action::Update,
        Action::Destroy,
    ];

    /// The method is part of the wire contract and cannot vary per resource.
    pub fn method(self) -> Method {
        match self {
            Action::Index | Action::Show => Method::Get,
            Action::Create => Method::Post,
            Action::Update => Method::Put,
            Action::Destroy => Method::Delete,
        }
    }

    /// Member actions address a single entity through `{id}`.
    pub fn is_member(self) -> bool {
        matches!(self, Action::Show | Action::Update | Action::Destroy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Show => "show",
            Action::Create => "create",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path parameters, keyed by capture name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A path template such as `/todos/{id}`, split into segments once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let segments: Vec<_> = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => Segment::Capture(name.to_string()),
                    None => Segment::Literal(segment.to_string()),
                }
            })
            .collect();

        let source = Self::render(&segments, |name| format!("{{{name}}}"));
        Self { source, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the capture segments, in order.
    pub fn captures(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path against the template.
    ///
    /// Literal segments must match exactly, captures match any non-empty
    /// segment. Paths that are empty, relative or not plain ASCII never
    /// match.
    pub fn matches(&self, path: &str) -> Option<Params> {
        if !path.is_ascii() {
            return None;
        }

        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = match rest {
            "" => Vec::new(),
            rest => rest.split('/').collect(),
        };

        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Capture(_) if part.is_empty() => return None,
                Segment::Capture(name) => {
                    let value = urlencoding::decode(part).ok()?;
                    params.insert(name.as_str(), value.into_owned());
                }
            }
        }

        Some(params)
    }

    /// Build a concrete path, percent-encoding every captured value.
    pub fn href(&self, params: &Params) -> Result<String, ResourceError> {
        if let Some(missing) = self.captures().find(|name| params.get(name).is_none()) {
            return Err(ResourceError::MissingParameter(missing.to_string()));
        }

        Ok(Self::render(&self.segments, |name| {
            // presence checked above
            urlencoding::encode(params.get(name).unwrap_or_default()).into_owned()
        }))
    }

    fn render(segments: &[Segment], mut capture: impl FnMut(&str) -> String) -> String {
        if segments.is_empty() {
            return String::from("/");
        }

        let mut path = String::new();
        for segment in segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Capture(name) => path.push_str(&capture(name)),
            }
        }
        path
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub action: Action,
    pub method: Method,
    pub template: PathTemplate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: String,
    base_path: String,
    actions: Vec<Action>,
}

impl ResourceDescriptor {
    /// A resource exposing all five actions under `base_path`.
    pub fn new(name: impl Into<String>, base_path: &str) -> Self {
        let base_path = base_path.trim_matches('/');

        Self {
            name: name.into(),
            base_path: format!("/{base_path}"),
            actions: Action::ALL.to_vec(),
        }
    }

    pub fn only(mut self, actions: &[Action]) -> Self {
        self.actions.retain(|action| actions.contains(action));
        self
    }

    pub fn except(mut self, actions: &[Action]) -> Self {
        self.actions.retain(|action| !actions.contains(action));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    pub fn route(&self, action: Action) -> Result<Route, ResourceError> {
        if !self.is_enabled(action) {
            return Err(ResourceError::ActionDisabled {
                resource: self.name.clone(),
                action,
            });
        }

        let template = match action.is_member() {
            true => format!("{}/{{id}}", self.base_path),
            false => self.base_path.clone(),
        };

        Ok(Route {
            action,
            method: action.method(),
            template: PathTemplate::parse(&template),
        })
    }

    /// Routes for every enabled action, in canonical action order.
    pub fn routes(&self) -> Vec<Route> {
        self.actions
            .iter()
            .filter_map(|&action| self.route(action).ok())
            .collect()
    }

    pub fn href(&self, action: Action, params: &Params) -> Result<String, ResourceError> {
        self.route(action)?.template.href(params)
    }
}

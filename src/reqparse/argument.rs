//! One declared request argument.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::inputs::ArgType;
use crate::request::Request;

/// Where in the request an argument is looked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    /// The URL query string.
    Query,
    /// A `application/x-www-form-urlencoded` body.
    Form,
    /// A JSON object body.
    Json,
    /// Request headers, matched case-insensitively.
    Headers,
}

impl Location {
    /// Phrase used in "missing parameter" messages.
    pub fn friendly(self) -> &'static str {
        match self {
            Self::Query   => "the query string",
            Self::Form    => "the post body",
            Self::Json    => "the JSON body",
            Self::Headers => "the HTTP headers",
        }
    }

    fn values(self, req: &Request, name: &str, action: Action) -> Vec<Value> {
        match self {
            Self::Query => pairs_named(req.query_pairs(), name),
            Self::Form => pairs_named(req.form_pairs(), name),
            Self::Json => match req.json().and_then(|body| body.get(name)) {
                Some(Value::Array(items)) if action == Action::Append => items.clone(),
                Some(value) => vec![value.clone()],
                None => Vec::new(),
            },
            Self::Headers => req
                .header_all(name)
                .into_iter()
                .map(|v| Value::String(v.to_owned()))
                .collect(),
        }
    }
}

fn pairs_named(pairs: &[(String, String)], name: &str) -> Vec<Value> {
    pairs
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| Value::String(v.clone()))
        .collect()
}

/// What to keep when an argument occurs more than once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// The first value.
    #[default]
    Store,
    /// Every value, as an array.
    Append,
}

/// The value stored for an argument the request does not carry.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    /// Called once per parse, e.g. for timestamps or fresh ids.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    fn resolve(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A declared request argument. Built once, read on every parse.
///
/// ```rust
/// use astor_restful::inputs;
/// use astor_restful::reqparse::{Action, Argument, Location};
///
/// let tags = Argument::new("tag")
///     .location(Location::Query)
///     .action(Action::Append)
///     .help("Bad tag: {error_msg}");
/// let rate = Argument::new("rate")
///     .arg_type(inputs::integer())
///     .required(true)
///     .help("Rate cannot be converted");
/// # let _ = (tags, rate);
/// ```
#[derive(Clone, Debug)]
pub struct Argument {
    pub(crate) name: String,
    dest: Option<String>,
    default: Option<DefaultValue>,
    required: bool,
    ignore: bool,
    arg_type: Option<ArgType>,
    locations: Vec<Location>,
    operators: Vec<String>,
    choices: Vec<Value>,
    action: Action,
    help: Option<String>,
    case_sensitive: bool,
    pub(crate) store_missing: bool,
    pub(crate) trim: Option<bool>,
    nullable: bool,
}

/// Outcome of looking one argument up in one request.
pub(crate) enum Lookup {
    Found(Value),
    Missing,
    Invalid(String),
}

impl Argument {
    /// A new optional argument read from the JSON body, form body and query
    /// string, with no coercion.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dest: None,
            default: None,
            required: false,
            ignore: false,
            arg_type: None,
            locations: vec![Location::Json, Location::Form, Location::Query],
            operators: vec!["=".to_owned()],
            choices: Vec::new(),
            action: Action::Store,
            help: None,
            case_sensitive: true,
            store_missing: true,
            trim: None,
            nullable: true,
        }
    }

    /// Key in the parse result. Defaults to the argument name.
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Computes the default anew on every parse.
    pub fn default_with(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Factory(Arc::new(f)));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Silently skip values that fail coercion instead of reporting them.
    pub fn ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = Some(arg_type);
        self
    }

    /// Reads only from `location`.
    pub fn location(mut self, location: Location) -> Self {
        self.locations = vec![location];
        self
    }

    /// Reads from several locations. When more than one supplies the
    /// argument, the one listed last wins.
    pub fn locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations = locations.into_iter().collect();
        self
    }

    /// Comparison operators accepted as key suffixes, e.g. `["=", "<=", ">="]`
    /// reads `price`, `price<` and `price>`. The first `=` of an operator is
    /// dropped to form the key; values from every operator are collected.
    /// Defaults to `["="]`.
    pub fn operators<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators = operators.into_iter().map(Into::into).collect();
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Message reported when the argument is invalid. `{error_msg}` is
    /// replaced with the underlying error.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// When `false`, string values and choices are compared lowercased and
    /// string values are stored lowercased.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// When `false`, a missing argument is left out of the result instead of
    /// being stored with its default.
    pub fn store_missing(mut self, store_missing: bool) -> Self {
        self.store_missing = store_missing;
        self
    }

    /// Strip surrounding whitespace from string values. Overrides the
    /// parser-wide setting.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = Some(trim);
        self
    }

    /// When `false`, a JSON `null` is rejected with "Must not be null".
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key this argument is stored under in the parse result.
    pub fn key(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn default_value(&self) -> Value {
        self.default.as_ref().map_or(Value::Null, DefaultValue::resolve)
    }

    /// Request keys this argument reads, one per operator.
    fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.operators
            .iter()
            .map(|op| format!("{}{}", self.name, op.replacen('=', "", 1)))
    }

    /// Looks the argument up in `req`, coercing and validating every value.
    ///
    /// When at least one value is accepted, the `(location, key)` pairs it
    /// came from are added to `consumed`.
    pub(crate) fn parse(
        &self,
        req: &Request,
        parser_trim: bool,
        consumed: &mut HashSet<(Location, String)>,
    ) -> Lookup {
        let trim = self.trim.unwrap_or(parser_trim);

        let mut raw = Vec::new();
        let mut sources = Vec::new();
        for &location in &self.locations {
            let mut values = Vec::new();
            let mut keys = Vec::new();
            for key in self.keys() {
                let found = location.values(req, &key, self.action);
                if !found.is_empty() {
                    values.extend(found);
                    keys.push((location, key));
                }
            }
            if !values.is_empty() {
                raw = values;
                sources = keys;
            }
        }

        let mut results = Vec::with_capacity(raw.len());
        for mut value in raw {
            if let Value::String(s) = &mut value {
                if trim {
                    *s = s.trim().to_owned();
                }
                if !self.case_sensitive {
                    *s = s.to_lowercase();
                }
            }

            let value = match self.convert(value) {
                Ok(v) => v,
                Err(_) if self.ignore => continue,
                Err(e) => return Lookup::Invalid(self.message(&e)),
            };

            if !self.choices.is_empty() && !self.is_choice(&value) {
                let shown = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Lookup::Invalid(self.message(&format!("{shown} is not a valid choice")));
            }
            results.push(value);
        }

        if results.is_empty() {
            if self.required {
                let places: Vec<&str> = self.locations.iter().map(|l| l.friendly()).collect();
                let missing = format!("Missing required parameter in {}", places.join(" or "));
                return Lookup::Invalid(self.message(&missing));
            }
            return Lookup::Missing;
        }
        consumed.extend(sources);

        match self.action {
            Action::Append => Lookup::Found(Value::Array(results)),
            Action::Store => Lookup::Found(results.swap_remove(0)),
        }
    }

    fn convert(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err("Must not be null".to_owned())
            };
        }
        match &self.arg_type {
            Some(t) => t.coerce(value, &self.name).map_err(|e| e.to_string()),
            None => Ok(value),
        }
    }

    fn is_choice(&self, value: &Value) -> bool {
        self.choices.iter().any(|choice| match (choice, value) {
            (Value::String(c), Value::String(v)) if !self.case_sensitive => c.to_lowercase() == *v,
            _ => choice == value,
        })
    }

    fn message(&self, error: &str) -> String {
        match &self.help {
            Some(help) => help.replace("{error_msg}", error),
            None => error.to_owned(),
        }
    }
}

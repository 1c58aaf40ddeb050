//! Declarative request-argument parsing.
//!
//! A [`RequestParser`] holds an ordered list of [`Argument`]s. Parsing a
//! request checks every argument and reports *all* failures at once as an
//! [`ApiError::Validation`], which renders as `400 Bad Request` with one
//! message per failing argument:
//!
//! ```rust
//! use astor_restful::{inputs, Request};
//! use astor_restful::reqparse::{Argument, RequestParser};
//!
//! let parser = RequestParser::new()
//!     .add_argument(Argument::new("rate").arg_type(inputs::integer()).required(true))
//!     .add_argument(Argument::new("name").required(true));
//!
//! let req = Request::builder().uri("/?rate=ten").build();
//! let err = parser.parse_args(&req).unwrap_err();
//! # let astor_restful::ApiError::Validation(errors) = err else { panic!() };
//! assert_eq!(errors.names().collect::<Vec<_>>(), vec!["name", "rate"]);
//! ```
//!
//! Parsing never mutates the parser; the same request parses to the same
//! result every time.

mod args;
mod argument;

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::api_error::{ApiError, ValidationErrors};
use crate::error::Error;
use crate::request::Request;

pub use args::Args;
pub use argument::{Action, Argument, DefaultValue, Location};

use argument::Lookup;

/// `(location, key)` pairs some argument read a value from.
type Consumed = HashSet<(Location, String)>;

/// An ordered set of uniquely named arguments.
#[derive(Clone, Debug, Default)]
pub struct RequestParser {
    args: Vec<Argument>,
    trim: bool,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim whitespace from every string value, unless an argument says
    /// otherwise.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Adds an argument. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if an argument with the same name already exists.
    pub fn add_argument(mut self, argument: Argument) -> Self {
        if self.position(&argument.name).is_some() {
            panic!("argument `{}` is already defined", argument.name);
        }
        self.args.push(argument);
        self
    }

    /// Swaps in a new version of the argument with the same name, keeping
    /// its position.
    pub fn replace_argument(&mut self, argument: Argument) -> Result<(), Error> {
        let idx = self
            .position(&argument.name)
            .ok_or_else(|| Error::UnknownArgument(argument.name.clone()))?;
        self.args[idx] = argument;
        Ok(())
    }

    pub fn remove_argument(&mut self, name: &str) -> Result<Argument, Error> {
        let idx = self
            .position(name)
            .ok_or_else(|| Error::UnknownArgument(name.to_owned()))?;
        Ok(self.args.remove(idx))
    }

    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|a| a.name == name)
    }

    /// Parses every argument out of `req`.
    ///
    /// Fails with [`ApiError::Validation`] naming every argument that was
    /// missing or invalid.
    pub fn parse_args(&self, req: &Request) -> Result<Args, ApiError> {
        self.parse_tracked(req).map(|(parsed, _)| parsed)
    }

    /// Like [`parse_args`](Self::parse_args), and additionally rejects query,
    /// form or JSON keys that no argument read from that location.
    pub fn parse_args_strict(&self, req: &Request) -> Result<Args, ApiError> {
        let (parsed, consumed) = self.parse_tracked(req)?;

        let mut unknown = BTreeSet::new();
        let sources = [
            (Location::Query, req.query_pairs()),
            (Location::Form, req.form_pairs()),
        ];
        for (location, pairs) in sources {
            for (key, _) in pairs {
                if !consumed.contains(&(location, key.clone())) {
                    unknown.insert(key.as_str());
                }
            }
        }
        for key in req.json().into_iter().flat_map(|body| body.keys()) {
            if !consumed.contains(&(Location::Json, key.clone())) {
                unknown.insert(key.as_str());
            }
        }

        if !unknown.is_empty() {
            let names: Vec<&str> = unknown.into_iter().collect();
            debug!(path = req.path(), unknown = ?names, "strict parsing rejected request");
            let message = format!("Unknown arguments: {}", names.join(", "));
            return Err(ApiError::bad_request(message));
        }
        Ok(parsed)
    }

    fn parse_tracked(&self, req: &Request) -> Result<(Args, Consumed), ApiError> {
        let mut parsed = Args::default();
        let mut errors = ValidationErrors::new();
        let mut consumed = HashSet::new();

        for arg in &self.args {
            match arg.parse(req, self.trim, &mut consumed) {
                Lookup::Found(value) => parsed.insert(arg.key(), value),
                Lookup::Missing if arg.store_missing => parsed.insert(arg.key(), arg.default_value()),
                Lookup::Missing => {}
                Lookup::Invalid(message) => errors.insert(arg.name.clone(), message),
            }
        }

        if !errors.is_empty() {
            debug!(path = req.path(), fields = %errors, "argument parsing failed");
            return Err(ApiError::Validation(errors));
        }
        Ok((parsed, consumed))
    }
}

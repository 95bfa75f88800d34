use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::bounds::project1;
use crate::error::ConstructionError;
use crate::optimization::config::MinimizerConfig;
use crate::optimization::problem::{Penalty, Problem};

/// A named model parameter with its feasible range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Group the parameter belongs to (e.g. `eden`, `thick`, `rough`).
    #[serde(default)]
    pub class: String,
    pub value: f64,
    pub min_val: f64,
    pub max_val: f64,
    /// Excluded from minimization.
    #[serde(default)]
    pub fixed: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64, min_val: f64, max_val: f64) -> Self {
        Self {
            name: name.into(),
            class: String::new(),
            value,
            min_val,
            max_val,
            fixed: false,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Project the value into range, same rules as the minimizer.
    pub fn clamp(&mut self) {
        self.value = project1(self.value, self.min_val, self.max_val);
    }

    pub fn is_within_bounds(&self) -> bool {
        self.value >= self.min_val && self.value <= self.max_val
    }
}

/// Case-insensitive unique parameter id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterId(String);

impl ParameterId {
    fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ParameterId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered registry of named parameters.
///
/// Index `i` of every vector built from the set refers to the `i`-th
/// registered parameter, so results map back by position.
#[derive(Clone, Debug, Default)]
pub struct ParameterSet {
    parameters: IndexMap<ParameterId, Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter under its (lowercased) name.
    ///
    /// When the name is taken, an id `<class>-<n>` is generated instead
    /// (`parameter-<n>` for parameters without a class).
    pub fn add(&mut self, parameter: Parameter) -> ParameterId {
        let requested = ParameterId::new(&parameter.name);
        let id = if requested.0.is_empty() || self.parameters.contains_key(&requested) {
            self.generate_id(&parameter.class)
        } else {
            requested
        };
        self.parameters.insert(id.clone(), parameter);
        id
    }

    fn generate_id(&self, class: &str) -> ParameterId {
        let base = if class.is_empty() { "parameter" } else { class };
        (1..)
            .map(|n| ParameterId::new(&format!("{base}-{n}")))
            .find(|id| !self.parameters.contains_key(id))
            .unwrap_or_else(|| ParameterId::new(base))
    }

    pub fn remove(&mut self, id: &str) -> Option<Parameter> {
        self.parameters.shift_remove(id.to_lowercase().as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Parameter> {
        self.parameters.get(id.to_lowercase().as_str())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Parameter> {
        self.parameters.get_mut(id.to_lowercase().as_str())
    }

    /// Parameters of one class, in registration order.
    pub fn by_class(&self, class: &str) -> Vec<(&ParameterId, &Parameter)> {
        self.parameters
            .iter()
            .filter(|(_, p)| p.class.eq_ignore_ascii_case(class))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterId, &Parameter)> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.parameters.values().map(|p| p.value).collect()
    }

    /// Build a problem over every registered parameter; fixed ones stay put.
    pub fn to_problem<P>(
        &self,
        penalty: P,
        config: MinimizerConfig,
    ) -> Result<Problem, ConstructionError>
    where
        P: Penalty + 'static,
    {
        let minima = self.parameters.values().map(|p| p.min_val).collect();
        let maxima = self.parameters.values().map(|p| p.max_val).collect();
        let fixed = self.parameters.values().map(|p| p.fixed).collect();
        Problem::new(self.values(), minima, maxima, penalty, config)?.with_fixed(fixed)
    }

    /// Write a minimizer result back, by position.
    pub fn apply(&mut self, values: &[f64]) -> Result<(), ConstructionError> {
        if values.len() != self.len() {
            return Err(ConstructionError::ValueCountMismatch {
                values: values.len(),
                parameters: self.len(),
            });
        }
        for (parameter, &value) in self.parameters.values_mut().zip(values) {
            parameter.value = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::solvers::{HillClimbMinimizer, Minimizer};

    fn layers() -> ParameterSet {
        let mut set = ParameterSet::new();
        set.add(Parameter::new("Eden_1", 0.40, 0.3, 0.34).with_class("eden"));
        set.add(Parameter::new("D_1", 7.0, 3.0, 30.0).with_class("thick"));
        set.add(Parameter::new("Background", 2e-6, 0.0, 1e-5).with_fixed(true));
        set
    }

    #[test]
    fn ids_are_case_insensitive_and_unique() {
        let mut set = layers();
        assert!(set.get("eden_1").is_some());
        assert!(set.get("EDEN_1").is_some());

        let id = set.add(Parameter::new("eden_1", 0.2, 0.1, 0.3).with_class("eden"));
        assert_eq!(id.as_str(), "eden-1");
        let id = set.add(Parameter::new("EDEN_1", 0.2, 0.1, 0.3).with_class("eden"));
        assert_eq!(id.as_str(), "eden-2");
        let id = set.add(Parameter::new("", 1.0, 0.0, 2.0));
        assert_eq!(id.as_str(), "parameter-1");
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn removal_keeps_order() {
        let mut set = layers();
        let removed = set.remove("d_1").unwrap();
        assert_eq!(removed.value, 7.0);
        let names: Vec<&str> = set.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, vec!["eden_1", "background"]);
    }

    #[test]
    fn groups_by_class() {
        let mut set = layers();
        set.add(Parameter::new("Eden_2", 0.30, 0.3, 0.34).with_class("eden"));
        let eden: Vec<&str> = set.by_class("EDEN").iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(eden, vec!["eden_1", "eden_2"]);
    }

    #[test]
    fn clamp_reflects_then_clamps() {
        let mut parameter = Parameter::new("sigma", -8.0, 1.0, 6.0);
        parameter.clamp();
        assert_eq!(parameter.value, 6.0);
        assert!(parameter.is_within_bounds());
    }

    #[test]
    fn builds_a_problem_and_applies_results() {
        let mut set = layers();
        let target = [0.32, 12.0];
        let penalty = move |params: &[f64]| {
            (params[0] - target[0]).powi(2) + ((params[1] - target[1]) / 10.0).powi(2)
        };
        let problem = set
            .to_problem(penalty, MinimizerConfig::new(5_000).with_seed(12))
            .unwrap();
        assert!(problem.is_fixed(2));

        let result = HillClimbMinimizer::new().minimize(&problem);
        set.apply(&result.params).unwrap();

        let background = set.get("background").unwrap();
        assert_eq!(background.value, 2e-6);
        assert!((set.get("d_1").unwrap().value - 12.0).abs() < 0.1);
        let err = set.apply(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::ValueCountMismatch { values: 1, parameters: 3 }
        ));
        assert_eq!(set.get("d_1").unwrap().value, result.params[1]);
    }
}

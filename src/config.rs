//! The dictionary-style configuration surface (§6): serde-deserializable
//! mirrors of [`Mask`], [`Parameter`] and [`Selector`] plus the top-level
//! `ConnectionCreatorConfig`, convertible into a [`ConnectionCreatorInit`].
//! A real front end parses this shape from TOML/JSON/a scripting
//! dictionary; the core never parses configuration itself, it only
//! consumes the already-typed [`ConnectionCreatorInit`] builder.

use crate::connection::{ConnectionCreatorInit, ConnectionType};
use crate::error::{ConnectError, ConnectResult};
use crate::geometry::Position;
use crate::layer::Selector;
use crate::mask::Mask;
use crate::parameter::Parameter;
use serde::{Deserialize, Serialize};

/// Resolves a node model's name to the `u32` id a [`Selector`] filters by.
/// Distinct from [`crate::sink::SynapseModelRegistry`], which resolves
/// synapse (edge) models rather than node models.
pub trait ModelNameResolver {
    fn resolve(&self, name: &str) -> Option<u32>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskSpec {
    Ball { center: Position, radius: f64 },
    Box { lower_left: Position, upper_right: Position, #[serde(default)] azimuth: f64, #[serde(default)] polar: f64 },
    Ellipse { center: Position, axes: Position, #[serde(default)] azimuth: f64, #[serde(default)] polar: f64 },
    Grid { shape: Vec<usize>, anchor: Vec<i64> },
    Intersection { a: Box<MaskSpec>, b: Box<MaskSpec> },
    Union { a: Box<MaskSpec>, b: Box<MaskSpec> },
    Difference { a: Box<MaskSpec>, b: Box<MaskSpec> },
    Converse { of: Box<MaskSpec> },
    Anchored { of: Box<MaskSpec>, offset: Position },
    All { dim: usize },
}

impl MaskSpec {
    pub fn into_mask(self) -> Mask {
        match self {
            MaskSpec::Ball { center, radius } => Mask::Ball { center, radius },
            MaskSpec::Box { lower_left, upper_right, azimuth, polar } => Mask::Box { lower_left, upper_right, azimuth, polar },
            MaskSpec::Ellipse { center, axes, azimuth, polar } => Mask::Ellipse { center, axes, azimuth, polar },
            MaskSpec::Grid { shape, anchor } => Mask::Grid { shape, anchor },
            MaskSpec::Intersection { a, b } => Mask::intersection(a.into_mask(), b.into_mask()),
            MaskSpec::Union { a, b } => Mask::union(a.into_mask(), b.into_mask()),
            MaskSpec::Difference { a, b } => Mask::difference(a.into_mask(), b.into_mask()),
            MaskSpec::Converse { of } => Mask::converse(of.into_mask()),
            MaskSpec::Anchored { of, offset } => Mask::anchored(of.into_mask(), offset),
            MaskSpec::All { dim } => Mask::All { dim },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSpec {
    Constant { value: f64 },
    Linear { a: f64, c: f64 },
    Exponential { a: f64, tau: f64, c: f64 },
    Gaussian { p_center: f64, mean: f64, sigma: f64, c: f64 },
    Gaussian2D {
        p_center: f64,
        mean_x: f64,
        sigma_x: f64,
        mean_y: f64,
        sigma_y: f64,
        rho: f64,
        c: f64,
    },
    Gamma { kappa: f64, theta: f64 },
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, sigma: f64, min: f64, max: f64 },
    Lognormal { mean: f64, sigma: f64, min: f64, max: f64 },
    Anchored { of: Box<ParameterSpec>, offset: Position },
    Converse { of: Box<ParameterSpec> },
    Product { a: Box<ParameterSpec>, b: Box<ParameterSpec> },
    Quotient { a: Box<ParameterSpec>, b: Box<ParameterSpec> },
    Sum { a: Box<ParameterSpec>, b: Box<ParameterSpec> },
    Difference { a: Box<ParameterSpec>, b: Box<ParameterSpec> },
}

impl ParameterSpec {
    pub fn into_parameter(self) -> Parameter {
        match self {
            ParameterSpec::Constant { value } => Parameter::Constant(value),
            ParameterSpec::Linear { a, c } => Parameter::Linear { a, c },
            ParameterSpec::Exponential { a, tau, c } => Parameter::Exponential { a, tau, c },
            ParameterSpec::Gaussian { p_center, mean, sigma, c } => Parameter::Gaussian { p_center, mean, sigma, c },
            ParameterSpec::Gaussian2D { p_center, mean_x, sigma_x, mean_y, sigma_y, rho, c } => {
                Parameter::Gaussian2D { p_center, mean_x, sigma_x, mean_y, sigma_y, rho, c }
            }
            ParameterSpec::Gamma { kappa, theta } => Parameter::Gamma { kappa, theta },
            ParameterSpec::Uniform { min, max } => Parameter::Uniform { min, max },
            ParameterSpec::Normal { mean, sigma, min, max } => Parameter::Normal { mean, sigma, min, max },
            ParameterSpec::Lognormal { mean, sigma, min, max } => Parameter::Lognormal { mean, sigma, min, max },
            ParameterSpec::Anchored { of, offset } => Parameter::anchored(of.into_parameter(), offset),
            ParameterSpec::Converse { of } => Parameter::converse(of.into_parameter()),
            ParameterSpec::Product { a, b } => Parameter::product(a.into_parameter(), b.into_parameter()),
            ParameterSpec::Quotient { a, b } => Parameter::quotient(a.into_parameter(), b.into_parameter()),
            ParameterSpec::Sum { a, b } => Parameter::sum(a.into_parameter(), b.into_parameter()),
            ParameterSpec::Difference { a, b } => Parameter::difference(a.into_parameter(), b.into_parameter()),
        }
    }
}

/// `{model: name?, depth: int?}` (§6); `model` is resolved against a
/// [`ModelNameResolver`] at config-conversion time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorSpec {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub depth: Option<u32>,
}

impl SelectorSpec {
    fn into_selector(self, resolver: &dyn ModelNameResolver) -> ConnectResult<Selector> {
        let model_id = match self.model {
            Some(name) => Some(resolver.resolve(&name).ok_or_else(|| ConnectError::BadProperty(format!("unknown node model: {name}")))?),
            None => None,
        };
        Ok(Selector { model_id, depth: self.depth })
    }
}

fn default_allow_true() -> bool {
    true
}

/// The top-level dictionary (§6). Deserializes from TOML/JSON; `into_init`
/// resolves `sources`/`targets` model names and produces the raw builder
/// that feeds [`crate::connection::ConnectionCreatorInit::parse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCreatorConfig {
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub number_of_connections: Option<u32>,
    #[serde(default = "default_allow_true")]
    pub allow_autapses: bool,
    #[serde(default = "default_allow_true")]
    pub allow_multapses: bool,
    #[serde(default)]
    pub allow_oversized_mask: bool,
    #[serde(default)]
    pub mask: Option<MaskSpec>,
    #[serde(default)]
    pub kernel: Option<ParameterSpec>,
    #[serde(default)]
    pub weight: Option<ParameterSpec>,
    #[serde(default)]
    pub delay: Option<ParameterSpec>,
    pub synapse_model: String,
    #[serde(default)]
    pub sources: SelectorSpec,
    #[serde(default)]
    pub targets: SelectorSpec,
}

impl ConnectionCreatorConfig {
    pub fn into_init(self, resolver: &dyn ModelNameResolver) -> ConnectResult<ConnectionCreatorInit> {
        let mut init = ConnectionCreatorInit::new(self.connection_type, self.synapse_model)
            .with_allow_autapses(self.allow_autapses)
            .with_allow_multapses(self.allow_multapses)
            .with_allow_oversized_mask(self.allow_oversized_mask)
            .with_source_filter(self.sources.into_selector(resolver)?)
            .with_target_filter(self.targets.into_selector(resolver)?);

        if let Some(n) = self.number_of_connections {
            init = init.with_number_of_connections(n);
        }
        if let Some(mask) = self.mask {
            init = init.with_mask(mask.into_mask());
        }
        if let Some(kernel) = self.kernel {
            init = init.with_kernel(kernel.into_parameter());
        }
        if let Some(weight) = self.weight {
            init = init.with_weight(weight.into_parameter());
        }
        if let Some(delay) = self.delay {
            init = init.with_delay(delay.into_parameter());
        }
        Ok(init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoModels;
    impl ModelNameResolver for NoModels {
        fn resolve(&self, _name: &str) -> Option<u32> {
            None
        }
    }

    #[test]
    fn parses_a_minimal_toml_config() {
        let toml_src = r#"
            connection_type = "pairwise_bernoulli_on_source"
            synapse_model = "static_synapse"

            [mask.ball]
            center = { D2 = [0.0, 0.0] }
            radius = 1.0
        "#;
        let config: ConnectionCreatorConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.connection_type, ConnectionType::PairwiseBernoulliOnSource);
        assert!(config.mask.is_some());
        let init = config.into_init(&NoModels).unwrap();
        let _ = init;
    }

    #[test]
    fn unknown_model_name_is_a_bad_property() {
        let config = ConnectionCreatorConfig {
            connection_type: ConnectionType::PairwiseBernoulliOnTarget,
            number_of_connections: None,
            allow_autapses: true,
            allow_multapses: true,
            allow_oversized_mask: false,
            mask: None,
            kernel: None,
            weight: None,
            delay: None,
            synapse_model: "static_synapse".into(),
            sources: SelectorSpec { model: Some("pyramidal".into()), depth: None },
            targets: SelectorSpec::default(),
        };
        assert!(matches!(config.into_init(&NoModels), Err(ConnectError::BadProperty(_))));
    }
}

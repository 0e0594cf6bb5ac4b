//! Convenience wrapper that owns the output buffers of a batch evaluation.

use super::evaluate_fields_with_config;
use crate::config::EvaluationConfig;
use crate::error::FieldError;
use crate::field::Field;
use crate::types::{IndexMask, Value};

enum Destination<'a> {
    Owned(Vec<Value>),
    Borrowed(&'a mut [Value]),
}

impl Destination<'_> {
    fn as_slice(&self) -> &[Value] {
        match self {
            Destination::Owned(values) => &values[..],
            Destination::Borrowed(values) => &values[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [Value] {
        match self {
            Destination::Owned(values) => &mut values[..],
            Destination::Borrowed(values) => &mut values[..],
        }
    }
}

/// Collects fields, evaluates them together and keeps the results.
///
/// ```ignore
/// let mut evaluator = FieldEvaluator::new(IndexMask::full(points.len()));
/// let positions = evaluator.add(position_field);
/// evaluator.evaluate()?;
/// let values = evaluator.get_evaluated(positions);
/// ```
pub struct FieldEvaluator<'a> {
    mask: IndexMask,
    config: EvaluationConfig,
    fields: Vec<Field>,
    destinations: Vec<Destination<'a>>,
    evaluated: bool,
}

impl<'a> FieldEvaluator<'a> {
    pub fn new(mask: IndexMask) -> Self {
        Self::with_config(mask, EvaluationConfig::default())
    }

    pub fn with_config(mask: IndexMask, config: EvaluationConfig) -> Self {
        Self {
            mask,
            config,
            fields: Vec::new(),
            destinations: Vec::new(),
            evaluated: false,
        }
    }

    /// Request `field`; the result is stored in a buffer owned by the evaluator.
    pub fn add(&mut self, field: Field) -> usize {
        let values = vec![field.data_type().default_value(); self.mask.min_array_size()];
        self.push(field, Destination::Owned(values))
    }

    /// Request `field`, writing the result into `destination`.
    pub fn add_with_destination(&mut self, field: Field, destination: &'a mut [Value]) -> usize {
        self.push(field, Destination::Borrowed(destination))
    }

    fn push(&mut self, field: Field, destination: Destination<'a>) -> usize {
        self.fields.push(field);
        self.destinations.push(destination);
        self.evaluated = false;
        self.fields.len() - 1
    }

    pub fn evaluate(&mut self) -> Result<(), FieldError> {
        let mut outputs: Vec<&mut [Value]> = self
            .destinations
            .iter_mut()
            .map(Destination::as_mut_slice)
            .collect();
        evaluate_fields_with_config(&self.fields, &self.mask, &mut outputs, &self.config)?;
        self.evaluated = true;
        Ok(())
    }

    /// Result of request `index`, once `evaluate` has succeeded.
    pub fn get_evaluated(&self, index: usize) -> Option<&[Value]> {
        if !self.evaluated {
            return None;
        }
        self.destinations.get(index).map(Destination::as_slice)
    }

    pub fn mask(&self) -> &IndexMask {
        &self.mask
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

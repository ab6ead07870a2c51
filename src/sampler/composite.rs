//! Composite sampling: an ordered chain of sub-samplers, each thinning
//! the previous stage's output.

use crate::error::Result;
use crate::sampler::{buffered_rows, Sampler};
use crate::value::Row;

pub struct CompositeSampler {
    stages: Vec<Box<dyn Sampler>>,
}

impl CompositeSampler {
    pub fn new(stages: Vec<Box<dyn Sampler>>) -> Self {
        Self { stages }
    }
}

impl Sampler for CompositeSampler {
    fn sample(
        &mut self,
        rows: &mut dyn Iterator<Item = Result<Row>>,
        columns: &[String],
    ) -> Result<Vec<Row>> {
        let mut current: Option<Vec<Row>> = None;

        for stage in &mut self.stages {
            let output = match current.take() {
                None => stage.sample(rows, columns)?,
                Some(previous) => {
                    let mut upstream = buffered_rows(previous);
                    stage.sample(&mut upstream, columns)?
                }
            };
            current = Some(output);
        }

        Ok(current.unwrap_or_default())
    }
}

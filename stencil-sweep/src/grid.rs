// Copyright 2022 Clemens Lutz
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Enumerate the parameter grid of a sweep.
//!
//! Both sweep dimensions are arithmetic progressions that stop at the last
//! value not exceeding the upper bound. The bound itself is only emitted if a
//! step lands on it exactly.

use std::iter::FusedIterator;

/// An inclusive arithmetic progression `start, start + step, ... <= end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepRange {
    next: Option<u32>,
    end: u32,
    step: u32,
}

impl StepRange {
    /// Creates a new progression.
    ///
    /// A `step` of zero yields `start` once, instead of repeating it forever.
    /// `SweepConfig::validate` rejects zero steps before a sweep starts.
    pub fn new(start: u32, end: u32, step: u32) -> Self {
        Self {
            next: if start <= end { Some(start) } else { None },
            end,
            step,
        }
    }
}

impl Iterator for StepRange {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next?;
        self.next = if self.step == 0 {
            None
        } else {
            current
                .checked_add(self.step)
                .filter(|&value| value <= self.end)
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match (self.next, self.step) {
            (None, _) => 0,
            (Some(_), 0) => 1,
            (Some(current), step) => ((self.end - current) / step) as usize + 1,
        };
        (len, Some(len))
    }
}

impl ExactSizeIterator for StepRange {}

impl FusedIterator for StepRange {}

/// A single configuration of the benchmark.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridPoint {
    pub iteration_count: u32,
    pub gpu_dim: u32,
}

/// The Cartesian product of two progressions.
///
/// Iteration counts form the outer loop and GPU dimensions the inner loop,
/// both in ascending order.
#[derive(Clone, Debug)]
pub struct GridPoints {
    iterations: StepRange,
    gpu_dims: StepRange,
    current_iteration: Option<u32>,
    current_gpu_dims: StepRange,
}

impl GridPoints {
    pub fn new(iterations: StepRange, gpu_dims: StepRange) -> Self {
        let mut iterations = iterations;
        let current_iteration = iterations.next();

        Self {
            iterations,
            gpu_dims,
            current_iteration,
            current_gpu_dims: gpu_dims,
        }
    }
}

impl Iterator for GridPoints {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        loop {
            let iteration_count = self.current_iteration?;

            if let Some(gpu_dim) = self.current_gpu_dims.next() {
                return Some(GridPoint {
                    iteration_count,
                    gpu_dim,
                });
            }

            self.current_iteration = self.iterations.next();
            self.current_gpu_dims = self.gpu_dims;

            // An empty inner dimension yields an empty grid
            if self.gpu_dims.len() == 0 {
                self.current_iteration = None;
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match self.current_iteration {
            None => 0,
            Some(_) => self.current_gpu_dims.len() + self.iterations.len() * self.gpu_dims.len(),
        };
        (len, Some(len))
    }
}

impl ExactSizeIterator for GridPoints {}

impl FusedIterator for GridPoints {}

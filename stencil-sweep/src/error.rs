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

use error_chain::error_chain;

error_chain! {
    errors {
        BuildFailure(msg: String) {
            description("Build failure")
            display("Build failed: {}", msg)
        }
        RunFailure(msg: String) {
            description("Benchmark run failure")
            display("Benchmark run failed: {}", msg)
        }
        CommandFailure(msg: String) {
            description("External command failure")
            display("Aborting with: {}", msg)
        }
        InvalidArgument(msg: String) {
            description("Invalid argument error")
            display("Aborted with: {}", msg)
        }
    }

    foreign_links {
        Csv(csv::Error);
        Io(::std::io::Error);
        ParseFloat(::std::num::ParseFloatError);
    }
}

impl Error {
    /// Returns true if the sweep may continue past this error under the
    /// `Skip` failure policy.
    ///
    /// Only build and run failures of a single grid point are recoverable. IO
    /// errors on the output files are always fatal.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::BuildFailure(_) | ErrorKind::RunFailure(_)
        )
    }
}

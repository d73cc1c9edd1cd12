// Copyright 2025 eraflo
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

//! The per-frame command stream.
//!
//! Deferred calls on the context are serialized into a [`CommandBuffer`] as
//! tagged [`Command`]s and decoded again, in recording order, when the frame
//! is committed.

mod buffer;
mod stream;

pub use buffer::{payload_len, CommandBuffer, CommandReader};
pub use stream::{Command, CommandKind};

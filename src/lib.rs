/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod parse;
pub use parse::{ChunkSizeAccumulator, HttpHeaderLine, HttpLineParseError};

mod body;
pub use body::{BodyFraming, BodyReadError, BodySelection, FrameControl, RequestBodyReader};

/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::BodyReadError;

mod control;
pub use control::FrameControl;

mod framing;
pub use framing::{BodyFraming, BodySelection};

mod chunked;

mod reader;
pub use reader::RequestBodyReader;

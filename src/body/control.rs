/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// Interim-response hook owned by the enclosing connection.
///
/// The reader calls [`produce_continue`](FrameControl::produce_continue)
/// the first time it has to wait on the transport for more body bytes, and
/// never again for the same request. The implementation decides whether a
/// `100 Continue` actually goes out: the client may not have sent
/// `Expect: 100-continue`, or the final response may already be underway.
pub trait FrameControl {
    fn produce_continue(&mut self);
}

impl<F> FrameControl for F
where
    F: FnMut(),
{
    fn produce_continue(&mut self) {
        (self)()
    }
}

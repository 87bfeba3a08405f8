// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Marlin integration tests.

pub mod harness;
pub mod mock_chatbot;
pub mod mock_transport;

pub use harness::{temp_cache, text_message};
pub use mock_chatbot::MockResponder;
pub use mock_transport::{MockConnection, MockTransport};

//! Contract tests against a mocked Google token endpoint.

mod broker;
mod common;

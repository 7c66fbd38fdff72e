//! Cross-module scenarios driving the public dispersal API.

mod authority_routing;
mod certificates;
mod dispersal_flows;
mod telemetry;

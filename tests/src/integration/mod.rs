//! Integration flows.

#[cfg(test)]
mod dts_flow;
#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod receive_flow;
#[cfg(test)]
mod send_flow;

/*!

Provides utilities for running `kstep` tests against a real cluster using `kind` and `docker`. These
are used by the tests behind the `integ` feature.

!*/

pub mod cluster;
mod test_settings;

pub use cluster::Cluster;

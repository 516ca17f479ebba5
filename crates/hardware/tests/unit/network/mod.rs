/// Arbitration fairness and grant-holding behaviour.
pub mod fairness;

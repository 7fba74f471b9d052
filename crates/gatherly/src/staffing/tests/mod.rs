mod common;

mod adjudication;
mod eligibility;

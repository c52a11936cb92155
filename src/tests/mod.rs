mod lookup_cases;
mod malformed_cases;

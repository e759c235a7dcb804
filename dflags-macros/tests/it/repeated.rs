dflags::dflags! {
    /// Run benchmarks.
    struct Bench {
        /// Filter by name.
        filter: Vec<String>,
        iterations: Vec<u32> = vec![10, 100],
    }
}

dflags::dflags! {
    /// Order food.
    struct Order {
        food: Food,
        mode: "fast" | "slow" = "fast",
        bits: 32 | 64 = 64,
    }

    enum Food {
        Gnocchi,
        Kimchi,
    }
}

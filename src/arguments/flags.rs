use bitflags::bitflags;

bitflags! {
    /// A set of argument positions. Used to mark which arguments of an
    /// initializer are released when the initializer is torn down.
    ///
    /// ```
    /// use init_args::Arguments;
    ///
    /// let flags = Arguments::FIRST | Arguments::THIRD;
    /// assert!(flags.contains(Arguments::nth(2).unwrap()));
    /// assert!(!flags.contains_position(2));
    /// assert_eq!(None, Arguments::nth(12));
    /// ```
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Arguments: u16 {
        const FIRST = 1 << 0;
        const SECOND = 1 << 1;
        const THIRD = 1 << 2;
        const FOURTH = 1 << 3;
        const FIFTH = 1 << 4;
        const SIXTH = 1 << 5;
        const SEVENTH = 1 << 6;
        const EIGHTH = 1 << 7;
        const NINTH = 1 << 8;
        const TENTH = 1 << 9;
        const ELEVENTH = 1 << 10;
        const TWELFTH = 1 << 11;
    }
}

impl Arguments {
    /// Gets the flag for the argument at the given zero-based index.
    #[must_use]
    pub fn nth(index: usize) -> Option<Self> {
        if index < 12 {
            Self::from_bits(1 << index)
        } else {
            None
        }
    }

    /// Checks whether the argument at the given one-based position is in
    /// this set.
    #[must_use]
    pub fn contains_position(self, position: usize) -> bool {
        position
            .checked_sub(1)
            .and_then(Self::nth)
            .map_or(false, |flag| self.contains(flag))
    }
}

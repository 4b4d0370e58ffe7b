/// Byte order selector for scalar encoding.
///
/// `Native` resolves to the host's compile-time byte order; `Little` and
/// `Big` force the named order regardless of host. Every compound
/// encode/decode call threads the same selector, unchanged, to every scalar
/// it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// Host-native byte order.
    #[default]
    Native,
    /// Force little-endian.
    Little,
    /// Force big-endian.
    Big,
}

/// The two byte orders a scalar can actually be encoded in, once `Native`
/// has been resolved against the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedEndian {
    /// Least-significant byte first.
    Little,
    /// Most-significant byte first.
    Big,
}

impl Endian {
    /// Resolve `Native` to the host's actual byte order; pass `Little`/`Big`
    /// through unchanged.
    #[must_use]
    pub const fn resolve(self) -> ResolvedEndian {
        match self {
            Self::Little => ResolvedEndian::Little,
            Self::Big => ResolvedEndian::Big,
            Self::Native => {
                #[cfg(target_endian = "little")]
                {
                    ResolvedEndian::Little
                }
                #[cfg(target_endian = "big")]
                {
                    ResolvedEndian::Big
                }
            }
        }
    }
}

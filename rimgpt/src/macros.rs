// SPDX-License-Identifier: MIT

#[macro_export]
/// Defines a set of GPT partition types, along with associated constants, lookup functions, and an enum for partition kinds.
///
/// This macro generates:
/// - A constant `[u8; 16]` for each partition type GUID, in on-disk byte order.
/// - A function to check if a partition entry matches a given type.
/// - A function to find the first slot of a given type in an entry array.
/// - An enum `GptPartitionKind` representing all defined partition types and an `Unknown` variant for unrecognized GUIDs.
/// - Implementations for converting between GUIDs and `GptPartitionKind`.
/// - A `Display` implementation for `GptPartitionKind`.
///
/// # Example
/// ```rust
/// use rimgpt::define_partition_types;
///
/// define_partition_types! {
///     ESP => "EFI System Partition", [0x28, 0x73, 0x2A, 0xC1, 0x1F, 0xF8, 0xD2, 0x11, 0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B],
/// }
///
/// assert_eq!(GptPartitionKind::from_guid(&GPT_PARTITION_TYPE_ESP), GptPartitionKind::ESP);
/// ```
///
/// # Generated Items
/// For each partition type:
/// - `pub const GPT_PARTITION_TYPE_<NAME>: [u8; 16]`
/// - `pub fn is_<name>_partition(entry: &GptPartitionEntry) -> bool`
/// - `pub fn find_<name>_partition(entries: &[GptPartitionEntry]) -> Option<usize>`
///
/// # Note
/// This macro requires the `paste` crate for identifier concatenation.
macro_rules! define_partition_types {
    (
        $(
            $name:ident => $desc:expr, $guid:expr
        ),+ $(,)?
    ) => {
        paste::paste! {
            $(
                #[doc = $desc]
                pub const [<GPT_PARTITION_TYPE_ $name:upper>]: [u8; 16] = $guid;

                #[doc = concat!("Checks if a GPT partition is of type: ", $desc)]
                pub fn [<is_ $name:lower _partition>](
                    entry: &$crate::gpt::GptPartitionEntry,
                ) -> bool {
                    entry.partition_type_guid == [<GPT_PARTITION_TYPE_ $name:upper>]
                }

                #[doc = concat!("Returns the slot of the first GPT partition of type: ", $desc)]
                pub fn [<find_ $name:lower _partition>](
                    entries: &[$crate::gpt::GptPartitionEntry],
                ) -> Option<usize> {
                    entries.iter().position([<is_ $name:lower _partition>])
                }
            )+

            #[allow(non_camel_case_types)]
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub enum GptPartitionKind {
                $($name,)+
                Unknown([u8; 16]),
            }

            impl GptPartitionKind {
                pub fn from_guid(guid: &[u8; 16]) -> Self {
                    match guid {
                        $(g if g == &[<GPT_PARTITION_TYPE_ $name:upper>] => Self::$name,)+
                        other => Self::Unknown(*other),
                    }
                }

                pub fn as_guid(&self) -> Option<&'static [u8; 16]> {
                    match self {
                        $(Self::$name => Some(&[<GPT_PARTITION_TYPE_ $name:upper>]),)+
                        Self::Unknown(_) => None,
                    }
                }
            }

            impl core::fmt::Display for GptPartitionKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self {
                        $(Self::$name => write!(f, $desc),)+
                        Self::Unknown(guid) => write!(f, "Unknown ({:02X?})", guid),
                    }
                }
            }
        }
    };
}

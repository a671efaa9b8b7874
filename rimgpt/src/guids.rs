// SPDX-License-Identifier: MIT

define_partition_types! {
    ESP => "EFI System Partition", [0x28, 0x73, 0x2A, 0xC1, 0x1F, 0xF8, 0xD2, 0x11, 0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B],
    LINUX => "Linux Filesystem", [0xAF, 0x3D, 0xC6, 0x0F, 0x83, 0x84, 0x72, 0x47, 0x8E, 0x79, 0x3D, 0x69, 0xD8, 0x47, 0x7D, 0xE4],
    LINUX_SWAP => "Linux Swap", [0x6D, 0xFD, 0x57, 0x06, 0xAB, 0xA4, 0xC4, 0x43, 0x84, 0xE5, 0x09, 0x33, 0xC8, 0x4B, 0x4F, 0x4F],
    DATA => "Microsoft Basic Data", [0xA2, 0xA0, 0xD0, 0xEB, 0xE5, 0xB9, 0x33, 0x44, 0x87, 0xC0, 0x68, 0xB6, 0xB7, 0x26, 0x99, 0xC7],
    BIOS_BOOT => "BIOS Boot Partition", [0x48, 0x61, 0x68, 0x21, 0x49, 0x64, 0x6F, 0x6E, 0x74, 0x4E, 0x65, 0x65, 0x64, 0x45, 0x46, 0x49],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpt::GptPartitionEntry;

    #[test]
    fn kind_roundtrip() {
        let k = GptPartitionKind::from_guid(&GPT_PARTITION_TYPE_LINUX);
        assert_eq!(k, GptPartitionKind::LINUX);
        assert_eq!(k.as_guid(), Some(&GPT_PARTITION_TYPE_LINUX));
        assert_eq!(k.to_string(), "Linux Filesystem");

        let unknown = GptPartitionKind::from_guid(&[7; 16]);
        assert_eq!(unknown, GptPartitionKind::Unknown([7; 16]));
        assert_eq!(unknown.as_guid(), None);
    }

    #[test]
    fn find_by_type() {
        let entries = [
            GptPartitionEntry::new(GPT_PARTITION_TYPE_ESP, [1; 16], 2048, 4095, 0, "ESP"),
            GptPartitionEntry::new(GPT_PARTITION_TYPE_LINUX, [2; 16], 4096, 8191, 0, "root"),
        ];
        assert!(is_esp_partition(&entries[0]));
        assert_eq!(find_linux_partition(&entries), Some(1));
        assert_eq!(find_linux_swap_partition(&entries), None);
    }
}

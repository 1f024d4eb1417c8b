//! SFTP permission bits.

/// A single POSIX permission bit as reported in SFTP attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilePermission {
    UsrR,
    UsrW,
    UsrX,
    GrpR,
    GrpW,
    GrpX,
    OthR,
    OthW,
    OthX,
    Sticky,
    SetGid,
    SetUid,
}

impl FilePermission {
    /// Every permission bit, highest first.
    pub const ALL: [FilePermission; 12] = [
        FilePermission::SetUid,
        FilePermission::SetGid,
        FilePermission::Sticky,
        FilePermission::UsrR,
        FilePermission::UsrW,
        FilePermission::UsrX,
        FilePermission::GrpR,
        FilePermission::GrpW,
        FilePermission::GrpX,
        FilePermission::OthR,
        FilePermission::OthW,
        FilePermission::OthX,
    ];

    /// The mode bit this permission stands for.
    pub fn mask(self) -> u32 {
        match self {
            FilePermission::UsrR => 0o400,
            FilePermission::UsrW => 0o200,
            FilePermission::UsrX => 0o100,
            FilePermission::GrpR => 0o040,
            FilePermission::GrpW => 0o020,
            FilePermission::GrpX => 0o010,
            FilePermission::OthR => 0o004,
            FilePermission::OthW => 0o002,
            FilePermission::OthX => 0o001,
            FilePermission::Sticky => 0o1000,
            FilePermission::SetGid => 0o2000,
            FilePermission::SetUid => 0o4000,
        }
    }

    /// OR together the bits of a permission set.
    pub fn to_mask<'a>(perms: impl IntoIterator<Item = &'a FilePermission>) -> u32 {
        perms.into_iter().fold(0, |acc, p| acc | p.mask())
    }

    /// Split a mode into its permission bits. File-type bits are ignored.
    pub fn from_mask(mask: u32) -> Vec<FilePermission> {
        Self::ALL
            .iter()
            .copied()
            .filter(|p| mask & p.mask() != 0)
            .collect()
    }
}

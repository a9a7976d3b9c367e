//! Permission bitflags for Discord-like access control
//!
//! Every flag has a fixed bit position that must never be renumbered: stored
//! overrides and role bitfields would silently change meaning otherwise.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Permission bitfield
    ///
    /// Stored as a decimal string in the database and serialized as a string in JSON,
    /// so consumers limited to 53-bit integers never lose precision.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        /// View channel and read messages
        const VIEW_CHANNEL     = 1 << 0;
        /// Send messages in text channels
        const SEND_MESSAGES    = 1 << 1;
        /// Edit and pin other users' messages
        const MANAGE_MESSAGES  = 1 << 2;
        /// Create, edit, delete channels and their overrides
        const MANAGE_CHANNELS  = 1 << 3;
        /// Create, edit, delete, assign roles
        const MANAGE_ROLES     = 1 << 4;
        /// Edit server settings
        const MANAGE_GUILD     = 1 << 5;
        /// Kick members from the server
        const KICK_MEMBERS     = 1 << 6;
        /// Ban members from the server
        const BAN_MEMBERS      = 1 << 7;
        /// Bypass all permission checks
        const ADMINISTRATOR    = 1 << 8;
        /// Upload files and images
        const ATTACH_FILES     = 1 << 9;
        /// Add emoji reactions
        const ADD_REACTIONS    = 1 << 10;
        /// Read the server audit log
        const VIEW_AUDIT_LOG   = 1 << 11;
        /// Time out members
        const MODERATE_MEMBERS = 1 << 12;
        /// Join voice channels
        const CONNECT          = 1 << 13;
        /// Speak in voice channels
        const SPEAK            = 1 << 14;
        /// Delete other users' messages
        const DELETE_MESSAGES  = 1 << 15;
        /// Mention @everyone
        const MENTION_EVERYONE = 1 << 16;
        /// Change other members' nicknames
        const MANAGE_NICKNAMES = 1 << 17;
        /// Create invites
        const CREATE_INVITE    = 1 << 18;
        /// Pin messages
        const PIN_MESSAGES     = 1 << 19;
        /// Embed links
        const EMBED_LINKS      = 1 << 20;
    }
}

impl Permissions {
    /// Default permissions for the @everyone role
    pub const DEFAULT: Self = Self::VIEW_CHANNEL
        .union(Self::SEND_MESSAGES)
        .union(Self::ADD_REACTIONS)
        .union(Self::ATTACH_FILES)
        .union(Self::CONNECT)
        .union(Self::SPEAK)
        .union(Self::EMBED_LINKS)
        .union(Self::CREATE_INVITE);

    /// Every defined flag (owners and administrators)
    pub const ALL: Self = Self::all();

    /// Pure bit test: true iff every bit of `permission` is set.
    ///
    /// Does not special-case ADMINISTRATOR; the resolver folds that in upstream.
    #[inline]
    pub fn has(&self, permission: Permissions) -> bool {
        self.contains(permission)
    }

    /// Check a single enumerated flag
    #[inline]
    pub fn has_flag(&self, flag: PermissionFlag) -> bool {
        self.contains(flag.bit())
    }

    /// Check if the permission set has any of the given permissions
    #[inline]
    pub fn has_any(&self, permissions: Permissions) -> bool {
        self.intersects(permissions)
    }

    /// Return a copy with one flag set or cleared
    #[inline]
    #[must_use]
    pub fn with_flag(self, flag: PermissionFlag, on: bool) -> Self {
        let mut next = self;
        next.set(flag.bit(), on);
        next
    }

    /// Combine permissions from multiple roles
    pub fn combine<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = Permissions>,
    {
        roles.into_iter().fold(Permissions::empty(), |acc, p| acc | p)
    }

    /// Parse a client-supplied decimal string
    ///
    /// Bits outside the defined flags are rejected rather than truncated.
    pub fn parse(s: &str) -> Result<Self, PermissionsParseError> {
        let bits = s
            .trim()
            .parse::<u64>()
            .map_err(|_| PermissionsParseError::InvalidFormat(s.to_string()))?;
        Permissions::from_bits(bits).ok_or(PermissionsParseError::UnknownBits(
            bits & !Permissions::ALL.bits(),
        ))
    }

    /// Decode a stored decimal string
    ///
    /// Stored values are trusted: unknown bits are dropped and an unreadable value
    /// grants nothing.
    pub fn from_stored(s: &str) -> Self {
        s.trim()
            .parse::<u64>()
            .map(Permissions::from_bits_truncate)
            .unwrap_or_else(|_| Permissions::empty())
    }

    /// Get the flags that are set, in bit order
    pub fn flags(&self) -> impl Iterator<Item = PermissionFlag> + '_ {
        PermissionFlag::ALL_FLAGS
            .iter()
            .copied()
            .filter(|flag| self.has_flag(*flag))
    }

    /// Get a list of all individual permission names that are set
    pub fn list(&self) -> Vec<&'static str> {
        self.flags().map(PermissionFlag::name).collect()
    }

    /// Check if this permission set is a subset of another
    #[inline]
    pub fn is_subset_of(&self, other: Permissions) -> bool {
        (*self & other) == *self
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::empty()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// Serialize as string for JSON (JavaScript BigInt safety)
impl Serialize for Permissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.bits().to_string())
    }
}

// Deserialize from string or number, rejecting undefined bits
impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct PermissionsVisitor;

        impl Visitor<'_> for PermissionsVisitor {
            type Value = Permissions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing permission bits")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map_err(|_| de::Error::custom("permissions cannot be negative"))
                    .and_then(|bits| self.visit_u64(bits))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Permissions::from_bits(value)
                    .ok_or_else(|| de::Error::custom("unknown permission bits"))
            }

            fn visit_str<E>(self, value: &str) -> Result<Permissions, E>
            where
                E: de::Error,
            {
                Permissions::parse(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(PermissionsVisitor)
    }
}

impl From<PermissionFlag> for Permissions {
    fn from(flag: PermissionFlag) -> Self {
        flag.bit()
    }
}

impl From<Permissions> for u64 {
    fn from(perms: Permissions) -> Self {
        perms.bits()
    }
}

/// Error when parsing a permission bitfield from a client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionsParseError {
    #[error("invalid permissions string: {0:?}")]
    InvalidFormat(String),

    #[error("unknown permission bits: {0:#x}")]
    UnknownBits(u64),
}

/// A single permission capability with a fixed bit position
///
/// Closed at compile time; the string and position boundaries reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PermissionFlag {
    ViewChannel = 0,
    SendMessages = 1,
    ManageMessages = 2,
    ManageChannels = 3,
    ManageRoles = 4,
    ManageGuild = 5,
    KickMembers = 6,
    BanMembers = 7,
    Administrator = 8,
    AttachFiles = 9,
    AddReactions = 10,
    ViewAuditLog = 11,
    ModerateMembers = 12,
    Connect = 13,
    Speak = 14,
    DeleteMessages = 15,
    MentionEveryone = 16,
    ManageNicknames = 17,
    CreateInvite = 18,
    PinMessages = 19,
    EmbedLinks = 20,
}

impl PermissionFlag {
    /// All flags, indexed by bit position
    pub const ALL_FLAGS: [PermissionFlag; 21] = [
        Self::ViewChannel,
        Self::SendMessages,
        Self::ManageMessages,
        Self::ManageChannels,
        Self::ManageRoles,
        Self::ManageGuild,
        Self::KickMembers,
        Self::BanMembers,
        Self::Administrator,
        Self::AttachFiles,
        Self::AddReactions,
        Self::ViewAuditLog,
        Self::ModerateMembers,
        Self::Connect,
        Self::Speak,
        Self::DeleteMessages,
        Self::MentionEveryone,
        Self::ManageNicknames,
        Self::CreateInvite,
        Self::PinMessages,
        Self::EmbedLinks,
    ];

    /// Bit position of this flag
    #[inline]
    pub const fn position(self) -> u8 {
        self as u8
    }

    /// The single-bit bitfield for this flag
    pub const fn bit(self) -> Permissions {
        match self {
            Self::ViewChannel => Permissions::VIEW_CHANNEL,
            Self::SendMessages => Permissions::SEND_MESSAGES,
            Self::ManageMessages => Permissions::MANAGE_MESSAGES,
            Self::ManageChannels => Permissions::MANAGE_CHANNELS,
            Self::ManageRoles => Permissions::MANAGE_ROLES,
            Self::ManageGuild => Permissions::MANAGE_GUILD,
            Self::KickMembers => Permissions::KICK_MEMBERS,
            Self::BanMembers => Permissions::BAN_MEMBERS,
            Self::Administrator => Permissions::ADMINISTRATOR,
            Self::AttachFiles => Permissions::ATTACH_FILES,
            Self::AddReactions => Permissions::ADD_REACTIONS,
            Self::ViewAuditLog => Permissions::VIEW_AUDIT_LOG,
            Self::ModerateMembers => Permissions::MODERATE_MEMBERS,
            Self::Connect => Permissions::CONNECT,
            Self::Speak => Permissions::SPEAK,
            Self::DeleteMessages => Permissions::DELETE_MESSAGES,
            Self::MentionEveryone => Permissions::MENTION_EVERYONE,
            Self::ManageNicknames => Permissions::MANAGE_NICKNAMES,
            Self::CreateInvite => Permissions::CREATE_INVITE,
            Self::PinMessages => Permissions::PIN_MESSAGES,
            Self::EmbedLinks => Permissions::EMBED_LINKS,
        }
    }

    /// Canonical flag name
    pub const fn name(self) -> &'static str {
        match self {
            Self::ViewChannel => "VIEW_CHANNEL",
            Self::SendMessages => "SEND_MESSAGES",
            Self::ManageMessages => "MANAGE_MESSAGES",
            Self::ManageChannels => "MANAGE_CHANNELS",
            Self::ManageRoles => "MANAGE_ROLES",
            Self::ManageGuild => "MANAGE_GUILD",
            Self::KickMembers => "KICK_MEMBERS",
            Self::BanMembers => "BAN_MEMBERS",
            Self::Administrator => "ADMINISTRATOR",
            Self::AttachFiles => "ATTACH_FILES",
            Self::AddReactions => "ADD_REACTIONS",
            Self::ViewAuditLog => "VIEW_AUDIT_LOG",
            Self::ModerateMembers => "MODERATE_MEMBERS",
            Self::Connect => "CONNECT",
            Self::Speak => "SPEAK",
            Self::DeleteMessages => "DELETE_MESSAGES",
            Self::MentionEveryone => "MENTION_EVERYONE",
            Self::ManageNicknames => "MANAGE_NICKNAMES",
            Self::CreateInvite => "CREATE_INVITE",
            Self::PinMessages => "PIN_MESSAGES",
            Self::EmbedLinks => "EMBED_LINKS",
        }
    }

    /// Look up a flag by its bit position
    pub fn from_position(position: u8) -> Option<Self> {
        Self::ALL_FLAGS.get(usize::from(position)).copied()
    }
}

impl fmt::Display for PermissionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PermissionFlag {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL_FLAGS
            .iter()
            .copied()
            .find(|flag| flag.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| crate::error::DomainError::UnknownPermissionFlag(wanted.to_string()))
    }
}

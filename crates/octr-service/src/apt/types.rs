//! Shared APT vocabulary: signals, applet ids, attributes, parameters

use std::any::Any;
use std::sync::Arc;

/// Signals passed between applets alongside a parameter
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalType {
    #[default]
    None = 0x0,
    Wakeup = 0x1,
    Request = 0x2,
    Response = 0x3,
    Exit = 0x4,
    Message = 0x5,
    HomeButtonSingle = 0x6,
    HomeButtonDouble = 0x7,
    DspSleep = 0x8,
    DspWakeup = 0x9,
    WakeupByExit = 0xA,
    WakeupByPause = 0xB,
    WakeupByCancel = 0xC,
    WakeupByCancelAll = 0xD,
    WakeupByPowerButtonClick = 0xE,
    WakeupToJumpHome = 0xF,
    RequestForSysApplet = 0x10,
    WakeupToLaunchApplication = 0x11,
}

/// Out-of-band notifications posted to a slot's notification event
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notification {
    #[default]
    None = 0,
    HomeButtonSingle = 1,
    HomeButtonDouble = 2,
    SleepQuery = 3,
    SleepCancelledByOpen = 4,
    SleepAccepted = 5,
    SleepAwake = 6,
    Shutdown = 7,
    PowerButtonClick = 8,
    PowerButtonClear = 9,
    TrySleep = 10,
    OrderToClose = 11,
}

/// Applet ids used by the APT protocol
///
/// The 0x100/0x200/0x400 entries are wildcard selectors that resolve
/// through slot occupancy rather than an exact match. Library applets
/// have two ids each; the 0x4xx range is used for the second instance.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppletId {
    AnySystemApplet = 0x100,
    HomeMenu = 0x101,
    AlternateMenu = 0x103,
    Camera = 0x110,
    FriendList = 0x112,
    GameNotes = 0x113,
    InternetBrowser = 0x114,
    InstructionManual = 0x115,
    Notifications = 0x116,
    Miiverse = 0x117,
    MiiversePost = 0x118,
    AmiiboSettings = 0x119,
    AnySysLibraryApplet = 0x200,
    SoftwareKeyboard1 = 0x201,
    Ed1 = 0x202,
    PnoteApp = 0x204,
    SnoteApp = 0x205,
    Error = 0x206,
    Mint = 0x207,
    Extrapad = 0x208,
    Memolib = 0x209,
    Application = 0x300,
    AnyLibraryApplet = 0x400,
    SoftwareKeyboard2 = 0x401,
    Ed2 = 0x402,
    PnoteApp2 = 0x404,
    SnoteApp2 = 0x405,
    Error2 = 0x406,
    Mint2 = 0x407,
    Extrapad2 = 0x408,
    Memolib2 = 0x409,
}

impl AppletId {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0x100 => Self::AnySystemApplet,
            0x101 => Self::HomeMenu,
            0x103 => Self::AlternateMenu,
            0x110 => Self::Camera,
            0x112 => Self::FriendList,
            0x113 => Self::GameNotes,
            0x114 => Self::InternetBrowser,
            0x115 => Self::InstructionManual,
            0x116 => Self::Notifications,
            0x117 => Self::Miiverse,
            0x118 => Self::MiiversePost,
            0x119 => Self::AmiiboSettings,
            0x200 => Self::AnySysLibraryApplet,
            0x201 => Self::SoftwareKeyboard1,
            0x202 => Self::Ed1,
            0x204 => Self::PnoteApp,
            0x205 => Self::SnoteApp,
            0x206 => Self::Error,
            0x207 => Self::Mint,
            0x208 => Self::Extrapad,
            0x209 => Self::Memolib,
            0x300 => Self::Application,
            0x400 => Self::AnyLibraryApplet,
            0x401 => Self::SoftwareKeyboard2,
            0x402 => Self::Ed2,
            0x404 => Self::PnoteApp2,
            0x405 => Self::SnoteApp2,
            0x406 => Self::Error2,
            0x407 => Self::Mint2,
            0x408 => Self::Extrapad2,
            0x409 => Self::Memolib2,
            _ => return None,
        })
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }
}

/// Position of an applet in the execution hierarchy
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppletPos {
    #[default]
    Application = 0,
    Library = 1,
    System = 2,
    SysLibrary = 3,
    Resident = 4,
    AutoLibrary = 5,
    Invalid = 0xFF,
}

impl AppletPos {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Application,
            1 => Self::Library,
            2 => Self::System,
            3 => Self::SysLibrary,
            4 => Self::Resident,
            5 => Self::AutoLibrary,
            _ => Self::Invalid,
        }
    }
}

/// Decoded applet attributes word
///
/// On the wire this is a u32 with a 3-bit position field and two flag
/// bits; the raw form only appears at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppletAttributes {
    pub pos: AppletPos,
    pub no_exit_on_system_applet: bool,
    pub is_home_menu: bool,
}

impl AppletAttributes {
    pub fn new(pos: AppletPos) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        Self {
            pos: AppletPos::from_raw(raw & 0x7),
            no_exit_on_system_applet: raw & (1 << 28) != 0,
            is_home_menu: raw & (1 << 29) != 0,
        }
    }

    pub fn to_raw(self) -> u32 {
        let pos = match self.pos {
            AppletPos::Invalid => 0x7,
            other => other as u32,
        };
        pos | (u32::from(self.no_exit_on_system_applet) << 28)
            | (u32::from(self.is_home_menu) << 29)
    }
}

/// Storage medium a title is launched from
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Nand = 0,
    Sdmc = 1,
    GameCard = 2,
}

/// Opaque payload handle carried alongside a parameter buffer
pub type SharedObject = Arc<dyn Any + Send + Sync>;

/// A message passed between applet slots through the mailbox
#[derive(Clone)]
pub struct MessageParameter {
    pub sender_id: Option<AppletId>,
    pub destination_id: AppletId,
    pub signal: SignalType,
    pub object: Option<SharedObject>,
    pub buffer: Vec<u8>,
}

impl std::fmt::Debug for MessageParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageParameter")
            .field("sender_id", &self.sender_id)
            .field("destination_id", &self.destination_id)
            .field("signal", &self.signal)
            .field("object", &self.object.as_ref().map(|_| "<object>"))
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}

/// How an application jump picks its target parameters
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationJumpFlags {
    UseInputParameters = 0,
    UseStoredParameters = 1,
    UseCurrentParameters = 2,
}

/// Startup argument handed to a launched application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverArg {
    pub param: Vec<u8>,
    pub hmac: Vec<u8>,
    pub source_program_id: u64,
}

impl Default for DeliverArg {
    fn default() -> Self {
        Self {
            param: Vec::new(),
            hmac: Vec::new(),
            source_program_id: u64::MAX,
        }
    }
}

/// Parameters captured by PrepareToDoApplicationJump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationJumpParameters {
    pub next_title_id: u64,
    pub next_media_type: MediaType,
    pub flags: ApplicationJumpFlags,
    pub current_title_id: u64,
    pub current_media_type: MediaType,
}

/// Parameters captured by PrepareToStartApplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationStartParameters {
    pub next_title_id: u64,
    pub next_media_type: MediaType,
}

/// Old/New 3DS target platform reported to applications
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPlatform {
    Old3ds = 0,
    New3ds = 1,
}

/// Old/New 3DS application running mode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationRunningMode {
    NoApplication = 0,
    Old3dsRegistered = 1,
    New3dsRegistered = 2,
    Old3dsUnregistered = 3,
    New3dsUnregistered = 4,
}

//! Static applet title tables and title resolution

use crate::apt::types::AppletId;
use octr_core::config::Region;

/// Per-applet title data
///
/// Each library applet has two possible applet ids, and a title id per
/// region. New 3DS consoles override some entries; a zero override means
/// the generic title is used.
struct AppletTitleData {
    applet_ids: [Option<AppletId>; 2],
    title_ids: [u64; Region::COUNT],
    n3ds_title_ids: [u64; Region::COUNT],
}

const NO_N3DS: [u64; Region::COUNT] = [0; Region::COUNT];

const APPLET_TITLES: &[AppletTitleData] = &[
    AppletTitleData {
        applet_ids: [Some(AppletId::HomeMenu), None],
        title_ids: [
            0x4003000008202,
            0x4003000008F02,
            0x4003000009802,
            0x4003000008202,
            0x400300000A102,
            0x400300000A902,
            0x400300000B102,
        ],
        n3ds_title_ids: [
            0x4003020008202,
            0x4003020008F02,
            0x4003020009802,
            0x4003020008202,
            0x400302000A102,
            0x400302000A902,
            0x400302000B102,
        ],
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::AlternateMenu), None],
        title_ids: [0x4003000008102; Region::COUNT],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Camera), None],
        title_ids: [
            0x4003000008402,
            0x4003000009002,
            0x4003000009902,
            0x4003000008402,
            0x400300000A202,
            0x400300000AA02,
            0x400300000B202,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::FriendList), None],
        title_ids: [
            0x4003000008D02,
            0x4003000009602,
            0x4003000009F02,
            0x4003000008D02,
            0x400300000A702,
            0x400300000AF02,
            0x400300000B702,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::GameNotes), None],
        title_ids: [
            0x4003000008702,
            0x4003000009302,
            0x4003000009C02,
            0x4003000008702,
            0x400300000A502,
            0x400300000AD02,
            0x400300000B502,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::InternetBrowser), None],
        title_ids: [
            0x4003000008802,
            0x4003000009402,
            0x4003000009D02,
            0x4003000008802,
            0x400300000A602,
            0x400300000AE02,
            0x400300000B602,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::InstructionManual), None],
        title_ids: [
            0x4003000008602,
            0x4003000009202,
            0x4003000009B02,
            0x4003000008602,
            0x400300000A402,
            0x400300000AC02,
            0x400300000B402,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Notifications), None],
        title_ids: [
            0x4003000008E02,
            0x4003000009702,
            0x400300000A002,
            0x4003000008E02,
            0x400300000A802,
            0x400300000B002,
            0x400300000B802,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Miiverse), None],
        title_ids: [
            0x400300000BC02,
            0x400300000BD02,
            0x400300000BE02,
            0x400300000BC02,
            0x4003000009E02,
            0x4003000009502,
            0x400300000B902,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    // Obtained from an older NS dump (firmware 4.5)
    AppletTitleData {
        applet_ids: [Some(AppletId::MiiversePost), None],
        title_ids: [0x400300000BA02; Region::COUNT],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::AmiiboSettings), None],
        title_ids: [
            0x4003000009502,
            0x4003000009E02,
            0x400300000B902,
            0x4003000009502,
            0x0,
            0x4003000008C02,
            0x400300000BF02,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [
            Some(AppletId::SoftwareKeyboard1),
            Some(AppletId::SoftwareKeyboard2),
        ],
        title_ids: [
            0x400300000C002,
            0x400300000C802,
            0x400300000D002,
            0x400300000C002,
            0x400300000D802,
            0x400300000DE02,
            0x400300000E402,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Ed1), Some(AppletId::Ed2)],
        title_ids: [
            0x400300000C102,
            0x400300000C902,
            0x400300000D102,
            0x400300000C102,
            0x400300000D902,
            0x400300000DF02,
            0x400300000E502,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::PnoteApp), Some(AppletId::PnoteApp2)],
        title_ids: [
            0x400300000C302,
            0x400300000CB02,
            0x400300000D302,
            0x400300000C302,
            0x400300000DB02,
            0x400300000E102,
            0x400300000E702,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::SnoteApp), Some(AppletId::SnoteApp2)],
        title_ids: [
            0x400300000C402,
            0x400300000CC02,
            0x400300000D402,
            0x400300000C402,
            0x400300000DC02,
            0x400300000E202,
            0x400300000E802,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Error), Some(AppletId::Error2)],
        title_ids: [
            0x400300000C502,
            0x400300000C502,
            0x400300000C502,
            0x400300000C502,
            0x400300000CF02,
            0x400300000CF02,
            0x400300000CF02,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Mint), Some(AppletId::Mint2)],
        title_ids: [
            0x400300000C602,
            0x400300000CE02,
            0x400300000D602,
            0x400300000C602,
            0x400300000DD02,
            0x400300000E302,
            0x400300000E902,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Extrapad), Some(AppletId::Extrapad2)],
        title_ids: [
            0x400300000CD02,
            0x400300000CD02,
            0x400300000CD02,
            0x400300000CD02,
            0x400300000D502,
            0x400300000D502,
            0x400300000D502,
        ],
        n3ds_title_ids: NO_N3DS,
    },
    AppletTitleData {
        applet_ids: [Some(AppletId::Memolib), Some(AppletId::Memolib2)],
        title_ids: [0x400300000F602; Region::COUNT],
        n3ds_title_ids: NO_N3DS,
    },
];

/// Resolve the launchable title for an applet in a given region
///
/// A non-zero New 3DS entry overrides the generic one when the console
/// reports New 3DS hardware. Returns `None` for applet ids with no
/// title (wildcards, the application itself, unknown entries).
pub fn title_id_for_applet(id: AppletId, region: Region, is_new_3ds: bool) -> Option<u64> {
    let data = APPLET_TITLES
        .iter()
        .find(|data| data.applet_ids.contains(&Some(id)))?;

    let index = region.index();
    if is_new_3ds && data.n3ds_title_ids[index] != 0 {
        return Some(data.n3ds_title_ids[index]);
    }

    match data.title_ids[index] {
        0 => None,
        title_id => Some(title_id),
    }
}

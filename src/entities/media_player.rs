use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::types::IntoLanguageText;

wire_enum! {
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
        On => "ON",
        Off => "OFF",
        Playing => "PLAYING",
        Paused => "PAUSED",
        Standby => "STANDBY",
        Buffering => "BUFFERING",
    }
}

wire_enum! {
    pub enum Features {
        OnOff => "on_off",
        Toggle => "toggle",
        Volume => "volume",
        VolumeUpDown => "volume_up_down",
        MuteToggle => "mute_toggle",
        Mute => "mute",
        Unmute => "unmute",
        PlayPause => "play_pause",
        Stop => "stop",
        Next => "next",
        Previous => "previous",
        FastForward => "fast_forward",
        Rewind => "rewind",
        Repeat => "repeat",
        Shuffle => "shuffle",
        Seek => "seek",
        MediaDuration => "media_duration",
        MediaPosition => "media_position",
        MediaTitle => "media_title",
        MediaArtist => "media_artist",
        MediaAlbum => "media_album",
        MediaImageUrl => "media_image_url",
        MediaType => "media_type",
        Dpad => "dpad",
        Home => "home",
        Menu => "menu",
        ColorButtons => "color_buttons",
        ChannelSwitcher => "channel_switcher",
        SelectSource => "select_source",
        SelectSoundMode => "select_sound_mode",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
        Volume => "volume",
        Muted => "muted",
        MediaDuration => "media_duration",
        MediaPosition => "media_position",
        MediaType => "media_type",
        MediaImageUrl => "media_image_url",
        MediaTitle => "media_title",
        MediaArtist => "media_artist",
        MediaAlbum => "media_album",
        Repeat => "repeat",
        Shuffle => "shuffle",
        Source => "source",
        SourceList => "source_list",
        SoundMode => "sound_mode",
        SoundModeList => "sound_mode_list",
    }
}

wire_enum! {
    pub enum Commands {
        On => "on",
        Off => "off",
        Toggle => "toggle",
        PlayPause => "play_pause",
        Stop => "stop",
        Previous => "previous",
        Next => "next",
        FastForward => "fast_forward",
        Rewind => "rewind",
        Seek => "seek",
        Volume => "volume",
        VolumeUp => "volume_up",
        VolumeDown => "volume_down",
        MuteToggle => "mute_toggle",
        Mute => "mute",
        Unmute => "unmute",
        Repeat => "repeat",
        Shuffle => "shuffle",
        ChannelUp => "channel_up",
        ChannelDown => "channel_down",
        CursorUp => "cursor_up",
        CursorDown => "cursor_down",
        CursorLeft => "cursor_left",
        CursorRight => "cursor_right",
        CursorEnter => "cursor_enter",
        FunctionRed => "function_red",
        FunctionGreen => "function_green",
        FunctionYellow => "function_yellow",
        FunctionBlue => "function_blue",
        Home => "home",
        Menu => "menu",
        Back => "back",
        SelectSource => "select_source",
        SelectSoundMode => "select_sound_mode",
        Search => "search",
    }
}

wire_enum! {
    pub enum DeviceClasses {
        Receiver => "receiver",
        SetTopBox => "set_top_box",
        Speaker => "speaker",
        StreamingBox => "streaming_box",
        Tv => "tv",
    }
}

wire_enum! {
    pub enum Options {
        VolumeSteps => "volume_steps",
    }
}

wire_enum! {
    pub enum MediaType {
        Music => "MUSIC",
        Radio => "RADIO",
        TvShow => "TVSHOW",
        Movie => "MOVIE",
        Video => "VIDEO",
    }
}

wire_enum! {
    pub enum RepeatMode {
        Off => "OFF",
        All => "ALL",
        One => "ONE",
    }
}

pub fn new<I>(id: impl Into<String>, name: impl IntoLanguageText, features: I) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    Entity::builder(id, name, EntityType::MediaPlayer).features(features)
}

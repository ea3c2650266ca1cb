use crate::soap;
use crate::soap::SoapError;
use quick_xml::events::Event;
use quick_xml::Reader;

pub const GET_CAPABILITIES: &str = r#"<tds:GetCapabilities xmlns:tds="http://www.onvif.org/ver10/device/wsdl"><tds:Category>All</tds:Category></tds:GetCapabilities>"#;

pub const GET_DEVICE_INFORMATION: &str =
    r#"<tds:GetDeviceInformation xmlns:tds="http://www.onvif.org/ver10/device/wsdl"/>"#;

pub const GET_HOSTNAME: &str =
    r#"<tds:GetHostname xmlns:tds="http://www.onvif.org/ver10/device/wsdl"/>"#;

pub const GET_SYSTEM_DATE_AND_TIME: &str =
    r#"<tds:GetSystemDateAndTime xmlns:tds="http://www.onvif.org/ver10/device/wsdl"/>"#;

pub const GET_PROFILES: &str =
    r#"<trt:GetProfiles xmlns:trt="http://www.onvif.org/ver10/media/wsdl"/>"#;

pub fn get_video_encoder_configuration_options(profile_token: &str) -> String {
    format!(
        r#"<trt:GetVideoEncoderConfigurationOptions xmlns:trt="http://www.onvif.org/ver10/media/wsdl"><trt:ProfileToken>{}</trt:ProfileToken></trt:GetVideoEncoderConfigurationOptions>"#,
        profile_token
    )
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeviceInformation {
    pub manufacturer: String,
    pub model: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub hardware_id: String,
}

pub fn parse_device_information(xml: &str) -> Result<DeviceInformation, SoapError> {
    Ok(DeviceInformation {
        manufacturer: require_text(xml, "Manufacturer")?,
        model: require_text(xml, "Model")?,
        firmware_version: require_text(xml, "FirmwareVersion")?,
        serial_number: require_text(xml, "SerialNumber")?,
        hardware_id: require_text(xml, "HardwareId")?,
    })
}

pub fn parse_hostname(xml: &str) -> Result<String, SoapError> {
    require_text(xml, "Name")
}

#[derive(Debug, PartialEq, Eq)]
pub struct SystemDateAndTime {
    pub date: String,
    pub time: String,
}

/// Reads the UTC clock out of a GetSystemDateAndTime response. The first
/// occurrence of each component wins, which is the UTCDateTime section;
/// LocalDateTime follows it in responses that carry both.
pub fn parse_system_date_and_time(xml: &str) -> Result<SystemDateAndTime, SoapError> {
    let date = format!(
        "{:04}-{:02}-{:02}",
        require_number(xml, "Year")?,
        require_number(xml, "Month")?,
        require_number(xml, "Day")?
    );
    let time = format!(
        "{:02}:{:02}:{:02}",
        require_number(xml, "Hour")?,
        require_number(xml, "Minute")?,
        require_number(xml, "Second")?
    );
    Ok(SystemDateAndTime { date, time })
}

#[derive(Debug, PartialEq, Eq)]
pub struct VideoEncoderOptions {
    pub resolutions: Vec<(u32, u32)>,
    pub frame_rate_min: u32,
    pub frame_rate_max: u32,
}

/// Reads the H.264 section of a GetVideoEncoderConfigurationOptions
/// response. Other codec sections carry the same element names and must not
/// leak into the result.
pub fn parse_video_encoder_options(xml: &str) -> Result<VideoEncoderOptions, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut resolutions = Vec::new();
    let mut width = None;
    let mut height = None;
    let mut frame_rate_min = None;
    let mut frame_rate_max = None;
    let mut in_h264 = false;
    let mut in_resolution = false;
    let mut in_frame_rate = false;
    let mut field = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"H264" => in_h264 = true,
                b"ResolutionsAvailable" if in_h264 => {
                    in_resolution = true;
                    width = None;
                    height = None;
                }
                b"FrameRateRange" if in_h264 => in_frame_rate = true,
                b"Width" if in_resolution => field = Some(Field::Width),
                b"Height" if in_resolution => field = Some(Field::Height),
                b"Min" if in_frame_rate => field = Some(Field::Min),
                b"Max" if in_frame_rate => field = Some(Field::Max),
                _ => {}
            },
            Event::Text(text) => {
                if let Some(field) = field {
                    let number = parse_number(&text.unescape()?, field)?;
                    match field {
                        Field::Width => width = Some(number),
                        Field::Height => height = Some(number),
                        Field::Min => frame_rate_min = Some(number),
                        Field::Max => frame_rate_max = Some(number),
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"H264" => in_h264 = false,
                b"ResolutionsAvailable" => {
                    if let (true, Some(width), Some(height)) = (in_resolution, width, height) {
                        resolutions.push((width, height));
                    }
                    in_resolution = false;
                }
                b"FrameRateRange" => in_frame_rate = false,
                b"Width" | b"Height" | b"Min" | b"Max" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(VideoEncoderOptions {
        resolutions,
        frame_rate_min: frame_rate_min.ok_or(SoapError::MissingElement("FrameRateRange"))?,
        frame_rate_max: frame_rate_max.ok_or(SoapError::MissingElement("FrameRateRange"))?,
    })
}

#[derive(Clone, Copy)]
enum Field {
    Width,
    Height,
    Min,
    Max,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Width => "Width",
            Field::Height => "Height",
            Field::Min => "Min",
            Field::Max => "Max",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub media_xaddr: Option<String>,
    pub has_ptz: bool,
}

pub fn parse_capabilities(xml: &str) -> Result<Capabilities, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut capabilities = Capabilities::default();
    let mut in_media = false;
    let mut in_xaddr = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Media" => in_media = true,
                b"XAddr" if in_media && capabilities.media_xaddr.is_none() => in_xaddr = true,
                b"PTZ" => capabilities.has_ptz = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"PTZ" => capabilities.has_ptz = true,
            Event::Text(text) if in_xaddr => {
                capabilities.media_xaddr = Some(text.unescape()?.into_owned())
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"Media" => in_media = false,
                b"XAddr" => in_xaddr = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(capabilities)
}

/// Returns the token of the first media profile in a GetProfiles response.
pub fn parse_first_profile_token(xml: &str) -> Result<String, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Profiles" => {
                for attribute in e.attributes() {
                    let attribute = attribute.map_err(quick_xml::Error::from)?;
                    if attribute.key.local_name().as_ref() == b"token" {
                        return Ok(String::from_utf8_lossy(&attribute.value).into_owned());
                    }
                }
                return Err(SoapError::MissingElement("Profiles"));
            }
            Event::Eof => return Err(SoapError::MissingElement("Profiles")),
            _ => {}
        }
    }
}

fn require_text(xml: &str, element: &'static str) -> Result<String, SoapError> {
    soap::find_text(xml, element).ok_or(SoapError::MissingElement(element))
}

fn require_number(xml: &str, element: &'static str) -> Result<u32, SoapError> {
    require_text(xml, element)?
        .trim()
        .parse()
        .map_err(|_| SoapError::UnexpectedValue(element))
}

fn parse_number(text: &str, field: Field) -> Result<u32, SoapError> {
    text.trim()
        .parse()
        .map_err(|_| SoapError::UnexpectedValue(field.name()))
}

//! 기본 동기화 대상 종목과 내장 별칭.

use quotesync_core::{normalize_symbol, AliasError, AliasSet};

/// B3 기본 종목 목록.
const B3_UNIVERSE: &[&str] = &[
    "AALR3", "ABCB4", "ABEV3", "AERI3", "AESB3", "AGRO3", "ALPA4", "ALOS3",
    "ALUP11", "AMBP3", "ANIM3", "ARML3", "ARZZ3", "ASAI3", "AURE3", "AZUL4",
    "B3SA3", "BBAS3", "BBDC3", "BBDC4", "BBSE3", "BEEF3", "BHIA3", "BLAU3",
    "BMOB3", "BPAC11", "BPAN4", "BRAP4", "BRFS3", "BRKM5", "BRPR3", "BRSR6",
    "CAML3", "CASH3", "CBAV3", "CCRO3", "CEAB3", "CIEL3", "CLSA3", "CMIG3",
    "CMIG4", "CMIN3", "COGN3", "CPFE3", "CPLE6", "CRFB3", "CSAN3", "CSMG3",
    "CSNA3", "CURY3", "CVCB3", "CXSE3", "CYRE3", "DASA3", "DIRR3", "DXCO3",
    "ECOR3", "EGIE3", "ELET3", "ELET6", "EMBR3", "ENAT3", "ENEV3", "ENGI11",
    "EQTL3", "ESPA3", "EVEN3", "EZTC3", "FESA4", "FLRY3", "FRAS3", "GFSA3",
    "GGBR4", "GGPS3", "GMAT3", "GOAU4", "GOLL4", "GRND3", "GUAR3", "HAPV3",
    "HBSA3", "HYPE3", "IFCM3", "IGTI11", "INTB3", "IRBR3", "ITSA4", "ITUB3",
    "ITUB4", "JALL3", "JBSS3", "JHSF3", "KEPL3", "KLBN11", "LAVV3", "LEVE3",
    "LJQQ3", "LOGG3", "LOGN3", "LREN3", "LUPA3", "LWSA3", "MATD3", "MBLY3",
    "MDIA3", "MEGA3", "MGLU3", "MILS3", "MLAS3", "MOVI3", "MRFG3", "MRVE3",
    "MULT3", "MYPK3", "NEOE3", "NTCO3", "ODPV3", "ONCO3", "ORVR3", "PCAR3",
    "PETR3", "PETR4", "PETZ3", "PGMN3", "PLPL3", "PNVL3", "POMO4", "POSI3",
    "PRIO3", "PSSA3", "PTBL3", "QUAL3", "RADL3", "RAIL3", "RAIZ4", "RANI3",
    "RAPT4", "RDOR3", "RECV3", "RENT3", "ROMI3", "RRRP3", "SANB11", "SAPR11",
    "SBFG3", "SBSP3", "SEER3", "SEQL3", "SIMH3", "SLCE3", "SMFT3", "SMTO3",
    "SOMA3", "SQIA3", "STBP3", "SUZB3", "TAEE11", "TASA4", "TEND3", "TGMA3",
    "TIMS3", "TOTS3", "TRIS3", "TRPL4", "TTEN3", "TUPY3", "UGPA3", "UNIP6",
    "USIM5", "VALE3", "VAMO3", "VBBR3", "VIVA3", "VIVT3", "VLID3", "VULC3",
    "WEGE3", "WIZC3", "YDUQ3", "ZAMP3",
];

/// `--sample` 실행용 소규모 종목 목록.
pub const SAMPLE_SYMBOLS: &[&str] = &["PETR4", "VALE3", "EZTC3", "BBDC4", "ITUB4"];

/// 티커 변경 등으로 다른 식별자로만 조회되는 종목.
const BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    ("TRPL4", &["TRPL4F.SA", "ISA.SA", "TRPL3.SA"]),
    // Vibra Energia 이전 티커
    ("VBBR3", &["BRDT3.SA"]),
    ("BRPR3", &["BRPR11.SA"]),
];

/// 기본 종목 목록 (정규화됨).
pub fn builtin_universe() -> Vec<String> {
    normalize_all(B3_UNIVERSE.iter().copied())
}

/// 샘플 종목 목록.
pub fn sample_universe() -> Vec<String> {
    normalize_all(SAMPLE_SYMBOLS.iter().copied())
}

/// 쉼표로 구분된 심볼 목록을 파싱합니다 (예: "PETR4, VALE3").
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    normalize_all(raw.split(','))
}

/// 내장 별칭 집합.
pub fn builtin_aliases(suffix: &str) -> Result<AliasSet, AliasError> {
    AliasSet::new(
        BUILTIN_ALIASES
            .iter()
            .map(|(symbol, aliases)| (*symbol, aliases.to_vec())),
        suffix,
    )
}

/// 앞뒤 공백을 제거하고 빈 항목을 버립니다. 중복은 그대로 유지합니다.
fn normalize_all<'a>(symbols: impl Iterator<Item = &'a str>) -> Vec<String> {
    symbols.filter_map(normalize_symbol).collect()
}

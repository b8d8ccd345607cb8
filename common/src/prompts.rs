//! フォーチュンクッキーのプロンプト
//!
//! アップロードを促す10種類の短いお題。CLIとWeb(WASM)で共有する。

/// お題のテーマとメッセージ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fortune {
    pub theme: &'static str,
    pub message: &'static str,
}

pub const FORTUNES: [Fortune; 10] = [
    Fortune {
        theme: "calm",
        message: "Some calm moments hide entire stories. Find a picture that feels like silence \u{2014} maybe a window view, a cup of tea, or a quiet sky. Let\u{2019}s see what peace looks like for you.",
    },
    Fortune {
        theme: "color",
        message: "Every color holds a memory. Show me an image whose colors remind you of warmth, nostalgia, or joy \u{2014} even if you can\u{2019}t explain why.",
    },
    Fortune {
        theme: "chaos",
        message: "Sometimes our feelings look like mess \u{2014} and that\u{2019}s okay. Upload an image that feels a little wild, imperfect, or full of energy. I\u{2019}ll help you find the meaning in its movement.",
    },
    Fortune {
        theme: "care",
        message: "Beauty often hides in the smallest gestures. Maybe it\u{2019}s a hand on a shoulder, an old note, or something that reminds you of care. Share a picture that holds quiet affection.",
    },
    Fortune {
        theme: "dream",
        message: "Every dream leaves a visual echo. Pick an image that feels like something between waking and sleeping \u{2014} soft light, reflections, shadows, or surreal forms.",
    },
    Fortune {
        theme: "curiosity",
        message: "Curiosity is the start of connection. Upload something that sparks your curiosity \u{2014} a texture, a place, or an object that makes you pause and look closer.",
    },
    Fortune {
        theme: "change",
        message: "Change is a kind of art. Show me an image that captures transformation \u{2014} a sunrise, falling leaves, or something that reminds you that nothing stays still forever.",
    },
    Fortune {
        theme: "shadow",
        message: "Every shadow has its story. Find a picture where light and dark meet \u{2014} a play of contrast that feels like emotion made visible.",
    },
    Fortune {
        theme: "wonder",
        message: "Wonder often hides in the ordinary. Capture something familiar \u{2014} a street corner, a favorite object, a passing glance \u{2014} and let\u{2019}s look at it as if for the first time.",
    },
    Fortune {
        theme: "perspective",
        message: "Your perspective is a poem. Share an image that feels like your way of seeing \u{2014} something only you would notice, something quietly yours.",
    },
];

/// インデックスでお題を取得（範囲外は循環）
pub fn fortune(index: usize) -> Fortune {
    FORTUNES[index % FORTUNES.len()]
}

//! crates/soul_map_core/src/catalog.rs
//!
//! The static archetype profiles and the quiz question set.

use crate::domain::{ArchetypeId, ArchetypeProfile, Palette, Question, QuizOption};

use ArchetypeId::{Adventurer, Healer, Scavenger};

pub static ARCHETYPES: [ArchetypeProfile; 3] = [
    ArchetypeProfile {
        id: Healer,
        name: "林間療癒者",
        subtitle: "在靜謐中找回內心的頻率",
        description: "你渴望平靜與壓力的釋放。深山林道、迷霧森林與慢活的村落是你靈魂的避風港。",
        keywords: ["平靜", "苔蘚綠", "霧氣灰", "木質感"],
        palette: Palette {
            primary: "#4A5D4E",
            secondary: "#9BA89B",
            accent: "#D6D1C4",
            background: "#F2F4F2",
            text: "#2D362E",
        },
    },
    ArchetypeProfile {
        id: Adventurer,
        name: "破浪冒險家",
        subtitle: "與大海與高山的極限對話",
        description: "你渴望自由，追求未知的挑戰。海岸秘境、險峻步道與那抹湛藍是你的動力源泉。",
        keywords: ["自由", "湛藍", "浪花白", "砂岩金"],
        palette: Palette {
            primary: "#1E3A5F",
            secondary: "#F8F9FA",
            accent: "#C5A059",
            background: "#F0F4F8",
            text: "#0D1B2A",
        },
    },
    ArchetypeProfile {
        id: Scavenger,
        name: "時光拾荒者",
        subtitle: "在歷史碎片中拾取感性力量",
        description: "你渴望懷舊與深度的情感連結。古鎮老街、文化遺址與琥珀色的夕陽最能觸動你的心弦。",
        keywords: ["懷舊", "胭脂紅", "磚瓦灰", "琥珀色"],
        palette: Palette {
            primary: "#8E354A",
            secondary: "#7D7D7D",
            accent: "#D68D3E",
            background: "#FAF7F2",
            text: "#3E1F25",
        },
    },
];

pub static QUESTIONS: [Question; 5] = [
    Question {
        id: 1,
        prompt: "獨自一人時，你更希望身處哪種氛圍？",
        options: &[
            QuizOption { text: "被群山環繞，空氣中帶著濕潤的木頭香", archetype: Healer },
            QuizOption { text: "站在懸崖邊緣，聽著怒吼的浪花拍打岩石", archetype: Adventurer },
            QuizOption { text: "在夕陽餘暉下，踩在有些鬆動的古老紅磚上", archetype: Scavenger },
        ],
    },
    Question {
        id: 2,
        prompt: "如果能擁有一種超能力，你希望是？",
        options: &[
            QuizOption { text: "能聽懂植物的語言，與森林共鳴", archetype: Healer },
            QuizOption { text: "能瞬間移動到最高的高山或最深的海洋", archetype: Adventurer },
            QuizOption { text: "能看見物品過去承載的所有記憶碎片", archetype: Scavenger },
        ],
    },
    Question {
        id: 3,
        prompt: "你最嚮往的週末下午是？",
        options: &[
            QuizOption { text: "在山中小屋靜靜喝茶看書", archetype: Healer },
            QuizOption { text: "徒步探索一條未曾在地圖上標示的小徑", archetype: Adventurer },
            QuizOption { text: "在老舊相館裡翻閱泛黃的舊照片", archetype: Scavenger },
        ],
    },
    Question {
        id: 4,
        prompt: "選一種代表你心境的質感？",
        options: &[
            QuizOption { text: "柔軟微涼的苔蘚", archetype: Healer },
            QuizOption { text: "堅硬粗糙的岩石", archetype: Adventurer },
            QuizOption { text: "溫潤斑駁的木紋", archetype: Scavenger },
        ],
    },
    Question {
        id: 5,
        prompt: "旅行對你而言，最深刻的意義是？",
        options: &[
            QuizOption { text: "修補疲憊，找回內心的平靜", archetype: Healer },
            QuizOption { text: "突破極限，證明自己的自由", archetype: Adventurer },
            QuizOption { text: "穿越時空，與未曾參與的歷史對話", archetype: Scavenger },
        ],
    },
];

/// Looks up the profile of an archetype.
pub fn profile(id: ArchetypeId) -> &'static ArchetypeProfile {
    &ARCHETYPES[id.index()]
}

pub fn questions() -> &'static [Question] {
    &QUESTIONS
}
